//! # Reminders Feature
//!
//! Reminder lifecycle engine: scheduling, periodic sweep, delivery through a
//! pluggable sink, and snooze/complete/dismiss transitions.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Injected clock and sink, repeat rules, concurrent timed deliveries
//! - 1.0.0: Initial release

pub mod model;
pub mod scheduler;
pub mod sink;
pub mod time;

pub use model::{Priority, Reminder, ReminderId, ReminderState, RepeatRule};
pub use scheduler::{
    ReminderScheduler, SchedulerError, SchedulerHandle, SchedulerSettings, SweepReport,
};
pub use sink::{ChannelSink, DeliveryError, LogSink, NotificationSink};
pub use time::{format_duration, parse_duration, resolve_time, TimeParseError};
