//! # Notifications Feature
//!
//! Notice templates for greetings, reflections, streaks and health nudges.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Inactivity and deadline watch
//! - 1.0.0: Initial templates

pub mod templates;
pub mod watch;

pub use templates::{
    deadline_warning, evening_reflection, inactivity_alert, mood_check_in, morning_greeting,
    streak_celebration, HealthReminder, Notice, NoticeKind,
};
pub use watch::NoticeWatch;
