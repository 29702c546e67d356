//! # Core Module
//!
//! Configuration and the injected clock shared by every feature.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod clock;
pub mod config;

pub use clock::{local_offset, Clock, ManualClock, SystemClock};
pub use config::Config;
