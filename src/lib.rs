// Core layer - configuration and clock
pub mod core;

// Features layer - all feature modules
pub mod features;

pub use crate::core::{Clock, Config, ManualClock, SystemClock};

pub use crate::features::{
    // Actions
    Action, ActionExtractor, ActionIntent, ActionKind, DirectiveParser, Extraction,
    // Conversation
    ActionCollaborator, AssistantReply, CompletionEngine, ConversationOrchestrator,
    DispatchOutcome, LoggingCollaborator, OpenAiCompletionEngine, OrchestratorSettings,
    // Habits
    Habit, HabitCompletion, HabitTracker, StreakPolicy,
    // Notifications
    HealthReminder, Notice,
    // Profile
    open_store, ProfileBackend, ProfileManager, ProfileStore, UserProfile,
    // Reminders
    ChannelSink, LogSink, NotificationSink, Reminder, ReminderScheduler, ReminderState,
    RepeatRule, SchedulerHandle, SchedulerSettings,
};
