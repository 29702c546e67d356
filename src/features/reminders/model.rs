//! Reminder entity and its lifecycle enums

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

pub type ReminderId = String;

/// How a reminder recurs after completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatRule {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatRule {
    pub fn is_repeating(&self) -> bool {
        !matches!(self, RepeatRule::Once)
    }

    /// Next trigger after `from`, keeping the time of day.
    ///
    /// `None` for `Once`, or when the calendar arithmetic overflows.
    pub fn advance(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RepeatRule::Once => None,
            RepeatRule::Daily => from.checked_add_signed(Duration::days(1)),
            RepeatRule::Weekly => from.checked_add_signed(Duration::days(7)),
            RepeatRule::Monthly => from.checked_add_months(Months::new(1)),
        }
    }
}

impl std::fmt::Display for RepeatRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatRule::Once => write!(f, "once"),
            RepeatRule::Daily => write!(f, "daily"),
            RepeatRule::Weekly => write!(f, "weekly"),
            RepeatRule::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for RepeatRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "once" | "none" | "" => Ok(RepeatRule::Once),
            "daily" => Ok(RepeatRule::Daily),
            "weekly" => Ok(RepeatRule::Weekly),
            "monthly" => Ok(RepeatRule::Monthly),
            _ => Err(anyhow::anyhow!("Invalid repeat rule: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(anyhow::anyhow!("Invalid priority: {}", s)),
        }
    }
}

/// Lifecycle state of a reminder
///
/// Allowed moves: `Scheduled -> {Snoozed, Completed, Dismissed}` and
/// `Snoozed -> {Scheduled, Completed, Dismissed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
    Scheduled,
    Snoozed,
    Completed,
    Dismissed,
}

impl ReminderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReminderState::Completed | ReminderState::Dismissed)
    }
}

impl std::fmt::Display for ReminderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderState::Scheduled => write!(f, "scheduled"),
            ReminderState::Snoozed => write!(f, "snoozed"),
            ReminderState::Completed => write!(f, "completed"),
            ReminderState::Dismissed => write!(f, "dismissed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub message: String,
    pub scheduled_time: DateTime<Utc>,
    pub repeat: RepeatRule,
    pub priority: Priority,
    pub state: ReminderState,
    pub snoozed_until: Option<DateTime<Utc>>,
    /// Set once the sink accepted a delivery for the current trigger
    pub delivered_this_cycle: bool,
    /// When the reminder entered a terminal state
    pub terminal_at: Option<DateTime<Utc>>,

    /// Bumped on every user transition so late delivery results from an
    /// earlier cycle are ignored
    #[serde(skip)]
    pub(crate) cycle: u64,
}

impl Reminder {
    /// New one-shot, medium-priority reminder with the default message
    pub fn new(title: impl Into<String>, scheduled_time: DateTime<Utc>) -> Self {
        let title = title.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: format!("Time for: {title}"),
            title,
            scheduled_time,
            repeat: RepeatRule::Once,
            priority: Priority::Medium,
            state: ReminderState::Scheduled,
            snoozed_until: None,
            delivered_this_cycle: false,
            terminal_at: None,
            cycle: 0,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatRule) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Instant at which the reminder next becomes due
    pub fn next_trigger(&self) -> DateTime<Utc> {
        match (self.state, self.snoozed_until) {
            (ReminderState::Snoozed, Some(until)) => until,
            _ => self.scheduled_time,
        }
    }

    /// Due check for a `Scheduled` reminder; snoozed ones are woken first
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == ReminderState::Scheduled && self.scheduled_time <= now
    }
}
