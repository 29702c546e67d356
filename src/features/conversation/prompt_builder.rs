//! Prompt construction for the completion engine
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use crate::features::profile::UserProfile;

/// Directive format the assistant is asked to use
const DIRECTIVE_INSTRUCTIONS: &str = r#"RESPONSE FORMAT:
Respond naturally and conversationally. If you need to perform actions, include them in your response like this:
[ACTION:reminder:{"title":"Drink water","time":"14:00","repeat":"daily"}]
[ACTION:task:{"title":"Buy groceries","priority":"medium"}]
[ACTION:calendar:{"title":"Team meeting","date":"2024-01-15","time":"10:00"}]
[ACTION:goal:{"title":"Run a 5k","deadline":"2024-06-01"}]
[ACTION:mood:{"mood":"tired","level":4}]
Action payloads must be flat JSON objects."#;

/// Builder for the per-turn prompt
///
/// # Example
///
/// ```ignore
/// let prompt = PromptBuilder::new(&profile)
///     .with_mood("calm")
///     .with_transcript(&history.transcript())
///     .build("Remind me to stretch at 3pm");
/// ```
pub struct PromptBuilder<'a> {
    profile: &'a UserProfile,
    mood: String,
    transcript: Option<String>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(profile: &'a UserProfile) -> Self {
        Self {
            profile,
            mood: profile.history.average_mood.clone(),
            transcript: None,
        }
    }

    pub fn with_mood(mut self, mood: &str) -> Self {
        self.mood = mood.to_string();
        self
    }

    /// Earlier turns; blank transcripts are left out
    pub fn with_transcript(mut self, transcript: &str) -> Self {
        self.transcript = (!transcript.trim().is_empty()).then(|| transcript.to_string());
        self
    }

    /// Persona and user context section
    pub fn system_prompt(&self) -> String {
        let p = self.profile;
        format!(
            "You are ChronoMate, a compassionate, emotionally intelligent personal assistant who helps users manage their time, health, and well-being.

PERSONALITY:
- Warm, empathetic, and understanding
- Adapts tone to the user's mood and communication style
- Proactive in suggesting helpful actions
- Speaks like a caring friend, not a formal assistant

USER CONTEXT:
- Name: {name}
- Communication Style: {style}
- Focus Areas: {focus}
- Preferred Times: {times}
- Current Mood: {mood}
- Completed Tasks: {tasks}
- Active Goals: {goals}
- Best Habit Streak: {streak}

CAPABILITIES:
- Create reminders and tasks
- Schedule calendar events
- Track habits and goals
- Provide emotional support

{directives}",
            name = p.name,
            style = p.preferences.communication_style,
            focus = p.preferences.focus_areas.join(", "),
            times = p.preferences.preferred_times.join(", "),
            mood = self.mood,
            tasks = p.history.completed_tasks,
            goals = p.active_goals().count(),
            streak = p.best_streak(),
            directives = DIRECTIVE_INSTRUCTIONS,
        )
    }

    /// Full prompt for one user message
    pub fn build(self, user_message: &str) -> String {
        let mut prompt = self.system_prompt();

        if let Some(transcript) = &self.transcript {
            prompt.push_str("\n\nRecent conversation:\n");
            prompt.push_str(transcript);
        }

        prompt.push_str(&format!(
            "\n\nCurrent user message: {user_message}\n\n\
             Respond as ChronoMate, being empathetic and helpful. \
             If you need to perform any actions, include them using the [ACTION:type:data] format."
        ));
        prompt
    }
}

/// Prompt for a short motivational insight
pub fn daily_insight_prompt(profile: &UserProfile, recent_messages: &[String], mood: &str) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    format!(
        "Based on this user's profile and recent activity, provide a brief, encouraging daily insight:\n\n\
         User Profile: {profile_json}\n\
         Recent Activity: {}\n\
         Current Mood: {mood}\n\n\
         Provide a warm, personalized insight that encourages and motivates. Keep it under 100 words.",
        recent_messages.join(", ")
    )
}

/// Prompt asking for three schedule tweaks, one per line
pub fn schedule_prompt(profile: &UserProfile) -> String {
    let preferences = serde_json::to_string(&profile.preferences).unwrap_or_default();
    let habits = serde_json::to_string(&profile.habits).unwrap_or_default();
    let goals = serde_json::to_string(&profile.goals).unwrap_or_default();
    format!(
        "Based on this user's preferences and habits, suggest 3 schedule optimizations:\n\n\
         Preferences: {preferences}\n\
         Habits: {habits}\n\
         Goals: {goals}\n\n\
         Provide 3 specific, actionable suggestions for optimizing their daily schedule, one per line."
    )
}
