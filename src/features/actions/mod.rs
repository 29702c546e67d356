//! # Actions Feature
//!
//! Pulls structured directives out of assistant replies and turns them into
//! typed intents for dispatch.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Typed intents validated before dispatch
//! - 1.0.0: Initial release

pub mod extractor;
pub mod intent;

pub use extractor::{Action, ActionExtractor, ActionKind, DirectiveParser, Extraction, ParseError};
pub use intent::{
    ActionIntent, CalendarIntent, GoalIntent, GoalRef, IntentError, MoodIntent, ReminderIntent,
    TaskIntent, DEFAULT_REMINDER_TIME,
};
