//! # Habit Tracker
//!
//! Per-habit completion counts and day streaks, stored on the user profile.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Streak resets after a missed day (`StreakPolicy::ResetOnGap`), milestones
//! - 1.0.0: Initial release

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::Clock;
use crate::features::profile::ProfileManager;

/// Streak lengths worth celebrating
pub const STREAK_MILESTONES: &[u32] = &[3, 7, 14, 30, 60, 100, 365];

/// What happens to a streak after a missed day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreakPolicy {
    /// A gap of more than one calendar day restarts the streak at 1
    #[default]
    ResetOnGap,
    /// Streaks only ever grow; same-day repeats are the only thing ignored
    Legacy,
}

impl std::fmt::Display for StreakPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreakPolicy::ResetOnGap => write!(f, "reset_on_gap"),
            StreakPolicy::Legacy => write!(f, "legacy"),
        }
    }
}

impl std::str::FromStr for StreakPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "reset_on_gap" | "reset" => Ok(StreakPolicy::ResetOnGap),
            "legacy" => Ok(StreakPolicy::Legacy),
            _ => Err(anyhow::anyhow!("Invalid streak policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub name: String,
    pub count: u64,
    pub streak: u32,
    pub last_completed_day: Option<NaiveDate>,
}

impl Habit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            streak: 0,
            last_completed_day: None,
        }
    }

    /// Record one completion on `day`. Returns whether the streak moved.
    pub fn record(&mut self, day: NaiveDate, policy: StreakPolicy) -> bool {
        self.count += 1;

        let extended = match self.last_completed_day {
            Some(last) if last == day => false,
            Some(last) if policy == StreakPolicy::ResetOnGap && (day - last).num_days() > 1 => {
                self.streak = 1;
                true
            }
            _ => {
                self.streak += 1;
                true
            }
        };

        self.last_completed_day = Some(day);
        extended
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitCompletion {
    pub habit: Habit,
    pub streak_extended: bool,
    /// Set when this completion landed exactly on a milestone
    pub milestone: Option<u32>,
}

pub struct HabitTracker {
    profile: Arc<ProfileManager>,
    clock: Arc<dyn Clock>,
    policy: StreakPolicy,
    /// Offset that defines calendar-day boundaries
    offset: FixedOffset,
}

impl HabitTracker {
    pub fn new(
        profile: Arc<ProfileManager>,
        clock: Arc<dyn Clock>,
        policy: StreakPolicy,
        offset: FixedOffset,
    ) -> Self {
        Self {
            profile,
            clock,
            policy,
            offset,
        }
    }

    pub fn policy(&self) -> StreakPolicy {
        self.policy
    }

    pub fn add_completion(&self, name: &str) -> HabitCompletion {
        self.add_completion_at(name, self.clock.now())
    }

    /// Record a completion at `when`; the habit is created on first use
    pub fn add_completion_at(&self, name: &str, when: DateTime<Utc>) -> HabitCompletion {
        let name = name.trim();
        let day = when.with_timezone(&self.offset).date_naive();
        let policy = self.policy;

        let (habit, streak_extended) = self.profile.update(|p| {
            let habit = p
                .habits
                .entry(name.to_string())
                .or_insert_with(|| Habit::new(name));
            let extended = habit.record(day, policy);
            (habit.clone(), extended)
        });

        let milestone = (streak_extended && STREAK_MILESTONES.contains(&habit.streak))
            .then_some(habit.streak);
        if let Some(days) = milestone {
            info!("🔥 Habit '{}' reached a {}-day streak", habit.name, days);
        }

        HabitCompletion {
            habit,
            streak_extended,
            milestone,
        }
    }

    pub fn habit(&self, name: &str) -> Option<Habit> {
        self.profile.snapshot().habits.get(name.trim()).cloned()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.profile.snapshot().habits.into_values().collect()
    }

    pub fn best_streak(&self) -> u32 {
        self.profile.snapshot().best_streak()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::features::profile::MemoryProfileStore;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 8, 0, 0).unwrap()
    }

    fn tracker(policy: StreakPolicy) -> (HabitTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(day(1)));
        let profile = Arc::new(ProfileManager::load(
            Box::new(MemoryProfileStore::default()),
            clock.clone(),
        ));
        let offset = FixedOffset::east_opt(0).unwrap();
        (HabitTracker::new(profile, clock.clone(), policy, offset), clock)
    }

    #[test]
    fn test_same_day_counts_but_streak_moves_once() {
        let (tracker, clock) = tracker(StreakPolicy::ResetOnGap);

        let first = tracker.add_completion("water");
        clock.advance(Duration::hours(6));
        let second = tracker.add_completion("water");

        assert_eq!(second.habit.count, 2);
        assert_eq!(second.habit.streak, 1);
        assert!(first.streak_extended);
        assert!(!second.streak_extended);
    }

    #[test]
    fn test_consecutive_days_extend_streak() {
        for policy in [StreakPolicy::ResetOnGap, StreakPolicy::Legacy] {
            let (tracker, _) = tracker(policy);
            for d in 1..=3 {
                tracker.add_completion_at("walk", day(d));
            }
            let habit = tracker.habit("walk").unwrap();
            assert_eq!(habit.streak, 3, "policy {policy}");
            assert_eq!(habit.last_completed_day, NaiveDate::from_ymd_opt(2024, 1, 3));
        }
    }

    #[test]
    fn test_gap_resets_streak_under_reset_policy() {
        let (tracker, _) = tracker(StreakPolicy::ResetOnGap);
        tracker.add_completion_at("read", day(1));
        tracker.add_completion_at("read", day(2));
        let after_gap = tracker.add_completion_at("read", day(5));

        assert_eq!(after_gap.habit.streak, 1);
        assert_eq!(after_gap.habit.count, 3);
        assert!(after_gap.streak_extended);
    }

    #[test]
    fn test_gap_keeps_growing_under_legacy_policy() {
        let (tracker, _) = tracker(StreakPolicy::Legacy);
        tracker.add_completion_at("read", day(1));
        tracker.add_completion_at("read", day(2));
        let after_gap = tracker.add_completion_at("read", day(5));

        assert_eq!(after_gap.habit.streak, 3);
    }

    #[test]
    fn test_day_boundary_follows_offset() {
        let clock = Arc::new(ManualClock::new(day(1)));
        let profile = Arc::new(ProfileManager::load(
            Box::new(MemoryProfileStore::default()),
            clock.clone(),
        ));
        // UTC-5: 2024-01-02 03:00 UTC is still Jan 1 locally
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let tracker = HabitTracker::new(profile, clock, StreakPolicy::ResetOnGap, offset);

        tracker.add_completion_at("journal", Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap());
        let late = tracker.add_completion_at("journal", Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap());

        assert_eq!(late.habit.streak, 1);
        assert_eq!(late.habit.count, 2);
    }

    #[test]
    fn test_milestone_reported_once() {
        let (tracker, _) = tracker(StreakPolicy::ResetOnGap);
        tracker.add_completion_at("yoga", day(1));
        tracker.add_completion_at("yoga", day(2));
        let third = tracker.add_completion_at("yoga", day(3));
        let again = tracker.add_completion_at("yoga", day(3));

        assert_eq!(third.milestone, Some(3));
        assert_eq!(again.milestone, None);
    }

    #[test]
    fn test_best_streak_and_listing() {
        let (tracker, _) = tracker(StreakPolicy::ResetOnGap);
        tracker.add_completion_at("a", day(1));
        tracker.add_completion_at("a", day(2));
        tracker.add_completion_at("b", day(2));

        assert_eq!(tracker.best_streak(), 2);
        assert_eq!(tracker.habits().len(), 2);
        assert!(tracker.habit("missing").is_none());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("reset-on-gap".parse::<StreakPolicy>().unwrap(), StreakPolicy::ResetOnGap);
        assert_eq!("LEGACY".parse::<StreakPolicy>().unwrap(), StreakPolicy::Legacy);
        assert!("never".parse::<StreakPolicy>().is_err());
    }
}
