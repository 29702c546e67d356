//! # Habits Feature
//!
//! Habit completion tracking with calendar-day streaks.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true

pub mod tracker;

pub use tracker::{Habit, HabitCompletion, HabitTracker, StreakPolicy, STREAK_MILESTONES};
