//! Inline directive extraction
//!
//! Assistant replies may carry machine-readable directives of the form
//! `[ACTION:<kind>:<flat JSON object>]`. The extractor pulls out every
//! recognized directive (in source order) and returns the reply with those
//! directives removed.
//!
//! ## Limitation
//! Payloads are matched with a brace-free pattern, so a payload containing
//! `{` or `}` anywhere (nested objects, or braces inside string values) is
//! never recognized and stays in the display text. This is a parser
//! limitation, not a business rule.

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Opening token of every directive
pub const DIRECTIVE_MARKER: &str = "[ACTION:";

static DIRECTIVE_RE: OnceLock<Regex> = OnceLock::new();

fn directive_regex() -> &'static Regex {
    DIRECTIVE_RE.get_or_init(|| {
        Regex::new(r"\[ACTION:(\w+):(\{[^{}]*\})\]").expect("directive pattern is a valid literal")
    })
}

/// Closed set of directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Reminder,
    Task,
    Calendar,
    Mood,
    Goal,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Reminder => "reminder",
            ActionKind::Task => "task",
            ActionKind::Calendar => "calendar",
            ActionKind::Mood => "mood",
            ActionKind::Goal => "goal",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reminder" => Ok(ActionKind::Reminder),
            "task" => Ok(ActionKind::Task),
            "calendar" => Ok(ActionKind::Calendar),
            "mood" => Ok(ActionKind::Mood),
            "goal" => Ok(ActionKind::Goal),
            _ => Err(ParseError::UnknownKind(s.to_string())),
        }
    }
}

/// Why a single directive was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown action kind '{0}'")]
    UnknownKind(String),

    #[error("invalid JSON payload for {kind} action: {message}")]
    InvalidJson { kind: ActionKind, message: String },

    #[error("{kind} payload must be a JSON object")]
    NotAnObject { kind: ActionKind },

    #[error("{kind} payload field '{field}' is nested; only flat objects are supported")]
    Nested { kind: ActionKind, field: String },
}

/// A structured action recovered from assistant text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    pub payload: Map<String, Value>,
}

/// Result of scanning one assistant reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Reply with every recognized directive removed
    pub display_text: String,
    /// Recognized actions in the order they appeared
    pub actions: Vec<Action>,
    /// Directives that matched the marker shape but were rejected
    pub rejected: Vec<ParseError>,
}

/// Turns assistant text into display text plus actions.
///
/// Kept behind a trait so the marker heuristic can be swapped without
/// touching the scheduler or the habit tracker.
pub trait DirectiveParser: Send + Sync {
    fn extract(&self, text: &str) -> Extraction;
}

/// Default `[ACTION:kind:{...}]` parser
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExtractor;

impl ActionExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse_directive(kind_token: &str, json: &str) -> Result<Action, ParseError> {
        let kind: ActionKind = kind_token.parse()?;

        let value: Value = serde_json::from_str(json).map_err(|e| ParseError::InvalidJson {
            kind,
            message: e.to_string(),
        })?;

        let Value::Object(payload) = value else {
            return Err(ParseError::NotAnObject { kind });
        };

        if let Some((field, _)) = payload
            .iter()
            .find(|(_, v)| v.is_object() || v.is_array())
        {
            return Err(ParseError::Nested {
                kind,
                field: field.clone(),
            });
        }

        Ok(Action { kind, payload })
    }
}

impl DirectiveParser for ActionExtractor {
    fn extract(&self, text: &str) -> Extraction {
        let mut display = String::with_capacity(text.len());
        let mut actions = Vec::new();
        let mut rejected = Vec::new();
        let mut cursor = 0;
        let mut matched = 0;

        for caps in directive_regex().captures_iter(text) {
            let (Some(whole), Some(kind), Some(json)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            matched += 1;

            match Self::parse_directive(kind.as_str(), json.as_str()) {
                Ok(action) => {
                    display.push_str(&text[cursor..whole.start()]);
                    cursor = splice_after_removal(&mut display, text, whole.end());
                    actions.push(action);
                }
                Err(e) => {
                    // Left in place: it was never recognized
                    warn!("Dropping directive {}: {e}", whole.as_str());
                    rejected.push(e);
                }
            }
        }
        display.push_str(&text[cursor..]);

        let unmatched = text.matches(DIRECTIVE_MARKER).count().saturating_sub(matched);
        if unmatched > 0 {
            debug!("{unmatched} directive marker(s) did not match the flat-payload pattern");
        }

        Extraction {
            display_text: display.trim().to_string(),
            actions,
            rejected,
        }
    }
}

fn is_inline_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Joins the text on either side of a removed directive.
///
/// Trims horizontal whitespace on both sides, keeps a single space between
/// words on the same line, and drops a line that the removal left empty.
/// Returns the byte offset in `text` where copying should resume.
fn splice_after_removal(display: &mut String, text: &str, removed_end: usize) -> usize {
    let trimmed_len = display.trim_end_matches(is_inline_space).len();
    display.truncate(trimmed_len);

    let rest = &text[removed_end..];
    let mut resume = removed_end + (rest.len() - rest.trim_start_matches(is_inline_space).len());
    let next = text[resume..].chars().next();

    let at_line_start = display.is_empty() || display.ends_with('\n');
    match next {
        Some('\n') if at_line_start => resume += 1,
        Some('\r') if at_line_start && text[resume..].starts_with("\r\n") => resume += 2,
        Some('\n') | Some('\r') | None => {}
        Some(_) if !at_line_start => display.push(' '),
        Some(_) => {}
    }

    resume
}
