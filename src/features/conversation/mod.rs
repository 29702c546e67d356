//! # Conversation Feature
//!
//! Dialogue window, prompt construction, completion engines and the
//! orchestrator that turns assistant replies into actions.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Daily insight and schedule suggestions
//! - 1.1.0: Per-action dispatch isolation, completion timeout fallback
//! - 1.0.0: Initial release

pub mod engine;
pub mod history;
pub mod insights;
pub mod orchestrator;
pub mod prompt_builder;

pub use engine::{complete_within, CompletionEngine, CompletionError, OpenAiCompletionEngine};
pub use history::{ConversationHistory, ConversationTurn, Speaker, ASSISTANT_NAME};
pub use insights::{analyze_sentiment, suggestions_for, Sentiment, FALLBACK_REPLY};
pub use orchestrator::{
    ActionCollaborator, AssistantReply, ConversationOrchestrator, DispatchOutcome,
    LoggingCollaborator, OrchestratorSettings,
};
pub use prompt_builder::PromptBuilder;
