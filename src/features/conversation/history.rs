//! Bounded dialogue window

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Name the assistant speaks under in transcripts
pub const ASSISTANT_NAME: &str = "ChronoMate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => ASSISTANT_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// FIFO of the most recent turns; the oldest turn is dropped on overflow
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>, timestamp: DateTime<Utc>) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(ConversationTurn {
            speaker,
            text: text.into(),
            timestamp,
        });
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// Text of the last `n` user turns, oldest first
    pub fn recent_user_messages(&self, n: usize) -> Vec<String> {
        let mut recent: Vec<String> = self
            .turns
            .iter()
            .rev()
            .filter(|t| t.speaker == Speaker::User)
            .take(n)
            .map(|t| t.text.clone())
            .collect();
        recent.reverse();
        recent
    }

    /// `Speaker: text` lines, oldest first
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker.label(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
