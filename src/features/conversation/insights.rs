//! Keyword sentiment, follow-up suggestions and canned fallbacks

pub const FALLBACK_REPLY: &str =
    "I'm having trouble processing that right now. Could you try rephrasing? I'm here to help! 🤗";

pub const FALLBACK_INSIGHT: &str = "Today is a new opportunity to make progress on your goals. I'm here to support you every step of the way! 🌟";

pub const FALLBACK_SCHEDULE_SUGGESTIONS: [&str; 3] = [
    "Schedule important tasks during your peak energy hours",
    "Include short breaks between focused work sessions",
    "Plan your most challenging tasks for when you feel most alert",
];

pub const MAX_SUGGESTIONS: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "great", "awesome", "excellent", "wonderful", "amazing", "love", "happy", "excited",
];
const NEGATIVE_WORDS: &[&str] = &[
    "sad", "angry", "frustrated", "tired", "stressed", "worried", "anxious",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Count positive against negative keywords
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// Up to three follow-ups keyed on what the user said
pub fn suggestions_for(user_message: &str) -> Vec<String> {
    let lower = user_message.to_lowercase();
    let mut suggestions: Vec<&str> = Vec::new();

    if lower.contains("tired") || lower.contains("exhausted") {
        suggestions.extend(["Schedule a rest break", "Take a short walk", "Practice deep breathing"]);
    }
    if lower.contains("stressed") || lower.contains("overwhelmed") {
        suggestions.extend([
            "Break tasks into smaller steps",
            "Schedule some downtime",
            "Try a quick meditation",
        ]);
    }
    if lower.contains("productive") || lower.contains("focus") {
        suggestions.extend([
            "Schedule important tasks for peak hours",
            "Set specific time blocks",
            "Review your goals",
        ]);
    }
    if suggestions.is_empty() {
        suggestions.extend([
            "How are you feeling today?",
            "What would you like to accomplish?",
            "Need help with your schedule?",
        ]);
    }

    suggestions
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(String::from)
        .collect()
}

/// Pull up to three suggestions out of a numbered or bulleted reply
pub fn parse_schedule_suggestions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .map(String::from)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let line = if digits > 0 && line[digits..].starts_with('.') {
        line[digits + 1..].trim_start()
    } else {
        line
    };
    line.strip_prefix(['-', '*']).map_or(line, str::trim_start)
}
