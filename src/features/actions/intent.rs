//! Typed intents derived from raw directive payloads
//!
//! Every kind has its own struct with required fields checked up front, so
//! handlers never look inside a loose JSON map.

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};

use super::extractor::{Action, ActionKind};
use crate::features::reminders::{Priority, RepeatRule};

/// Wall-clock time used when a reminder directive omits `time`
pub const DEFAULT_REMINDER_TIME: &str = "09:00";
pub const DEFAULT_TASK_CATEGORY: &str = "other";
pub const DEFAULT_EVENT_TYPE: &str = "personal";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("{kind} action is missing required field '{field}'")]
    MissingField { kind: ActionKind, field: &'static str },

    #[error("{kind} action has invalid '{field}': {message}")]
    InvalidField {
        kind: ActionKind,
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderIntent {
    pub title: String,
    /// Unresolved time expression; resolved against the clock at dispatch
    pub time: Option<String>,
    pub repeat: RepeatRule,
    pub priority: Priority,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskIntent {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarIntent {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub event_type: String,
    pub priority: Priority,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoodIntent {
    pub mood: Option<String>,
    pub level: Option<u8>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoalRef {
    Id(String),
    Title(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoalIntent {
    Add {
        title: String,
        deadline: Option<NaiveDate>,
    },
    Progress {
        target: GoalRef,
        progress: u8,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionIntent {
    Reminder(ReminderIntent),
    Task(TaskIntent),
    Calendar(CalendarIntent),
    Mood(MoodIntent),
    Goal(GoalIntent),
}

impl ActionIntent {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionIntent::Reminder(_) => ActionKind::Reminder,
            ActionIntent::Task(_) => ActionKind::Task,
            ActionIntent::Calendar(_) => ActionKind::Calendar,
            ActionIntent::Mood(_) => ActionKind::Mood,
            ActionIntent::Goal(_) => ActionKind::Goal,
        }
    }
}

impl TryFrom<&Action> for ActionIntent {
    type Error = IntentError;

    fn try_from(action: &Action) -> Result<Self, Self::Error> {
        let fields = Fields {
            kind: action.kind,
            payload: &action.payload,
        };

        match action.kind {
            ActionKind::Reminder => Ok(ActionIntent::Reminder(ReminderIntent {
                title: fields.required("title")?,
                time: fields.optional("time"),
                repeat: fields.parsed_or("repeat", RepeatRule::Once)?,
                priority: fields.parsed_or("priority", Priority::Medium)?,
                message: fields.optional("message"),
            })),
            ActionKind::Task => Ok(ActionIntent::Task(TaskIntent {
                title: fields.required("title")?,
                description: fields.optional("description"),
                priority: fields.parsed_or("priority", Priority::Medium)?,
                category: fields
                    .optional("category")
                    .unwrap_or_else(|| DEFAULT_TASK_CATEGORY.to_string()),
            })),
            ActionKind::Calendar => {
                let date = fields.required("date")?;
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|e| fields.invalid("date", e))?;
                let time = match fields.optional("time") {
                    Some(raw) => Some(
                        NaiveTime::parse_from_str(&raw, "%H:%M")
                            .map_err(|e| fields.invalid("time", e))?,
                    ),
                    None => None,
                };

                Ok(ActionIntent::Calendar(CalendarIntent {
                    title: fields.required("title")?,
                    date,
                    time,
                    event_type: fields
                        .optional("type")
                        .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
                    priority: fields.parsed_or("priority", Priority::Medium)?,
                    description: fields.optional("description"),
                }))
            }
            ActionKind::Mood => {
                let mood = fields.optional("mood");
                let level = match fields.optional("level") {
                    Some(raw) => Some(
                        raw.parse::<u8>()
                            .ok()
                            .filter(|l| (1..=10).contains(l))
                            .ok_or_else(|| fields.invalid("level", "expected 1-10"))?,
                    ),
                    None => None,
                };
                if mood.is_none() && level.is_none() {
                    return Err(IntentError::MissingField {
                        kind: ActionKind::Mood,
                        field: "mood",
                    });
                }

                Ok(ActionIntent::Mood(MoodIntent {
                    mood,
                    level,
                    note: fields.optional("note"),
                }))
            }
            ActionKind::Goal => {
                let op = fields.optional("action").unwrap_or_else(|| "add".to_string());
                match op.to_lowercase().as_str() {
                    "add" => {
                        let deadline = match fields.optional("deadline") {
                            Some(raw) => Some(
                                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                                    .map_err(|e| fields.invalid("deadline", e))?,
                            ),
                            None => None,
                        };
                        Ok(ActionIntent::Goal(GoalIntent::Add {
                            title: fields.required("title")?,
                            deadline,
                        }))
                    }
                    "progress" | "update" => {
                        let target = match (fields.optional("id"), fields.optional("title")) {
                            (Some(id), _) => GoalRef::Id(id),
                            (None, Some(title)) => GoalRef::Title(title),
                            (None, None) => {
                                return Err(IntentError::MissingField {
                                    kind: ActionKind::Goal,
                                    field: "title",
                                })
                            }
                        };
                        let raw = fields.required("progress")?;
                        let progress = raw
                            .parse::<f64>()
                            .ok()
                            .filter(|p| (0.0..=100.0).contains(p))
                            .ok_or_else(|| fields.invalid("progress", "expected 0-100"))?;

                        Ok(ActionIntent::Goal(GoalIntent::Progress {
                            target,
                            progress: progress.round() as u8,
                        }))
                    }
                    other => Err(fields.invalid("action", format!("unsupported goal action '{other}'"))),
                }
            }
        }
    }
}

/// Field accessor over a flat payload
struct Fields<'a> {
    kind: ActionKind,
    payload: &'a Map<String, Value>,
}

impl Fields<'_> {
    /// Scalar value as text; blank strings and nulls count as absent
    fn optional(&self, field: &str) -> Option<String> {
        let text = match self.payload.get(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn required(&self, field: &'static str) -> Result<String, IntentError> {
        self.optional(field).ok_or(IntentError::MissingField {
            kind: self.kind,
            field,
        })
    }

    fn parsed_or<T>(&self, field: &'static str, default: T) -> Result<T, IntentError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(field) {
            Some(raw) => raw.parse::<T>().map_err(|e| self.invalid(field, e)),
            None => Ok(default),
        }
    }

    fn invalid(&self, field: &'static str, message: impl std::fmt::Display) -> IntentError {
        IntentError::InvalidField {
            kind: self.kind,
            field,
            message: message.to_string(),
        }
    }
}
