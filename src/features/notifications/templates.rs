//! Ready-made notices for the UI host

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::features::reminders::{Priority, Reminder, RepeatRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
            priority: Priority::Medium,
        }
    }

    fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

pub fn morning_greeting(name: &str, tasks_planned: usize) -> Notice {
    Notice::new(
        NoticeKind::Success,
        "Good Morning!",
        format!(
            "Good morning {name}! You have {tasks_planned} tasks planned for today. Let's make it a productive day! 🌅"
        ),
    )
}

/// End-of-day summary; tone follows the completion rate (80% / 60% bands)
pub fn evening_reflection(completed: usize, total: usize) -> Notice {
    let rate = if total == 0 {
        0
    } else {
        (completed * 100 + total / 2) / total
    };

    let message = if rate >= 80 {
        format!("Amazing work today! You completed {completed} out of {total} tasks. You're on fire! 🔥")
    } else if rate >= 60 {
        format!("Good progress today! You completed {completed} out of {total} tasks. Keep it up! 💪")
    } else {
        format!("You completed {completed} out of {total} tasks today. Tomorrow is a new opportunity! 🌟")
    };

    Notice::new(NoticeKind::Info, "Evening Reflection", message)
}

pub fn inactivity_alert() -> Notice {
    Notice::new(
        NoticeKind::Warning,
        "Taking a break?",
        "You've been inactive for a while. Want to review your progress or plan your next steps?",
    )
}

pub fn streak_celebration(days: u32) -> Notice {
    Notice::new(
        NoticeKind::Success,
        "🔥 Streak Achievement!",
        format!("Congratulations! You've maintained a {days}-day streak! You're building amazing habits!"),
    )
}

pub fn deadline_warning(task_title: &str, minutes_left: i64) -> Notice {
    Notice::new(
        NoticeKind::Warning,
        "⏰ Deadline Approaching",
        format!("\"{task_title}\" is due in {minutes_left} minutes. Need to reschedule?"),
    )
    .with_priority(Priority::High)
}

pub fn mood_check_in() -> Notice {
    Notice::new(
        NoticeKind::Info,
        "😊 How are you feeling?",
        "Take a moment to check in with yourself. Your mood affects your productivity!",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthReminder {
    Water,
    Exercise,
    Break,
    Meditation,
}

impl HealthReminder {
    fn text(&self) -> (&'static str, &'static str) {
        match self {
            HealthReminder::Water => (
                "💧 Hydration Check",
                "Time to drink some water! Staying hydrated helps you stay focused and energized.",
            ),
            HealthReminder::Exercise => (
                "💪 Move Your Body",
                "Take a short walk or do some stretching. Your body and mind will thank you!",
            ),
            HealthReminder::Break => (
                "☕ Take a Break",
                "You've been working hard. Take a 5-minute break to refresh your mind.",
            ),
            HealthReminder::Meditation => (
                "🧘 Mindful Moment",
                "Time for a quick meditation session. Even 2 minutes can make a difference.",
            ),
        }
    }

    pub fn notice(&self) -> Notice {
        let (title, message) = self.text();
        Notice::new(NoticeKind::Info, title, message)
    }

    /// Reminder carrying this notice's text, ready for the scheduler
    pub fn reminder(&self, at: DateTime<Utc>, repeat: RepeatRule) -> Reminder {
        let (title, message) = self.text();
        Reminder::new(title, at)
            .with_message(message)
            .with_repeat(repeat)
    }
}

impl std::str::FromStr for HealthReminder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "water" => Ok(HealthReminder::Water),
            "exercise" => Ok(HealthReminder::Exercise),
            "break" => Ok(HealthReminder::Break),
            "meditation" | "meditate" => Ok(HealthReminder::Meditation),
            _ => Err(anyhow::anyhow!("Unknown health reminder: {}", s)),
        }
    }
}
