//! Per-user profile aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::habits::Habit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderFrequency {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationStyle {
    Formal,
    Casual,
    #[default]
    Friendly,
}

impl std::fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommunicationStyle::Formal => write!(f, "formal"),
            CommunicationStyle::Casual => write!(f, "casual"),
            CommunicationStyle::Friendly => write!(f, "friendly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub reminder_frequency: ReminderFrequency,
    pub focus_areas: Vec<String>,
    /// Wall-clock `HH:MM` slots the user likes to be nudged at
    pub preferred_times: Vec<String>,
    pub communication_style: CommunicationStyle,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reminder_frequency: ReminderFrequency::Medium,
            focus_areas: vec!["health".to_string(), "productivity".to_string()],
            preferred_times: vec!["09:00".to_string(), "13:00".to_string(), "18:00".to_string()],
            communication_style: CommunicationStyle::Friendly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionHistory {
    pub interactions: u64,
    pub completed_tasks: u64,
    /// Most recently reported mood
    pub average_mood: String,
    pub last_active: DateTime<Utc>,
}

impl Default for InteractionHistory {
    fn default() -> Self {
        Self {
            interactions: 0,
            completed_tasks: 0,
            average_mood: "neutral".to_string(),
            last_active: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    /// Percent complete, 0-100
    pub progress: u8,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub preferences: Preferences,
    pub history: InteractionHistory,
    pub habits: BTreeMap<String, Habit>,
    pub goals: Vec<Goal>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: "user-1".to_string(),
            name: "User".to_string(),
            preferences: Preferences::default(),
            history: InteractionHistory::default(),
            habits: BTreeMap::new(),
            goals: Vec::new(),
        }
    }
}

impl UserProfile {
    pub fn active_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(|g| !g.is_complete())
    }

    pub fn best_streak(&self) -> u32 {
        self.habits.values().map(|h| h.streak).max().unwrap_or(0)
    }

    /// Case-insensitive title lookup
    pub fn find_goal_by_title(&self, title: &str) -> Option<&Goal> {
        let needle = title.trim().to_lowercase();
        self.goals.iter().find(|g| g.title.to_lowercase() == needle)
    }
}
