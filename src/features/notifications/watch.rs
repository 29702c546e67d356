//! Periodic checks that raise inactivity and deadline notices

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use super::templates::{deadline_warning, inactivity_alert, Notice};
use crate::features::reminders::{Priority, Reminder, ReminderId};

pub const INACTIVITY_MINUTES: i64 = 30;
pub const DEADLINE_WARNING_MINUTES: i64 = 15;

/// Tracks what has already been announced so each notice fires once
#[derive(Debug)]
pub struct NoticeWatch {
    last_input: DateTime<Utc>,
    inactivity_alerted: bool,
    warned: HashSet<(ReminderId, DateTime<Utc>)>,
}

impl NoticeWatch {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_input: now,
            inactivity_alerted: false,
            warned: HashSet::new(),
        }
    }

    /// The user did something; re-arms the inactivity alert
    pub fn record_input(&mut self, now: DateTime<Utc>) {
        self.last_input = now;
        self.inactivity_alerted = false;
    }

    /// Notices due at `now`.
    ///
    /// High-priority reminders firing within the warning window get one
    /// deadline warning per occurrence.
    pub fn check(&mut self, now: DateTime<Utc>, active: &[Reminder]) -> Vec<Notice> {
        let mut notices = Vec::new();

        if !self.inactivity_alerted && now - self.last_input >= Duration::minutes(INACTIVITY_MINUTES) {
            self.inactivity_alerted = true;
            notices.push(inactivity_alert());
        }

        let window = Duration::minutes(DEADLINE_WARNING_MINUTES);
        for reminder in active.iter().filter(|r| r.priority == Priority::High) {
            let at = reminder.next_trigger();
            let left = at - now;
            if left <= Duration::zero() || left > window {
                continue;
            }
            if self.warned.insert((reminder.id.clone(), at)) {
                // Round up so "14m59s" reads as 15 minutes
                let minutes = (left.num_seconds() + 59) / 60;
                notices.push(deadline_warning(&reminder.title, minutes));
            }
        }

        self.warned.retain(|(_, at)| *at > now);
        notices
    }
}
