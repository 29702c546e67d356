//! # Features
//!
//! Each feature lives in its own module with a `mod.rs` header describing
//! its version and history.

pub mod actions;
pub mod conversation;
pub mod habits;
pub mod notifications;
pub mod profile;
pub mod reminders;

pub use actions::{Action, ActionExtractor, ActionIntent, ActionKind, DirectiveParser, Extraction};
pub use conversation::{
    ActionCollaborator, AssistantReply, CompletionEngine, ConversationOrchestrator,
    DispatchOutcome, LoggingCollaborator, OpenAiCompletionEngine, OrchestratorSettings,
};
pub use habits::{Habit, HabitCompletion, HabitTracker, StreakPolicy};
pub use notifications::{HealthReminder, Notice};
pub use profile::{open_store, ProfileBackend, ProfileManager, ProfileStore, UserProfile};
pub use reminders::{
    ChannelSink, LogSink, NotificationSink, Reminder, ReminderScheduler, ReminderState,
    RepeatRule, SchedulerHandle, SchedulerSettings,
};
