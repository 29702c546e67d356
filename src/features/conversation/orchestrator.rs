//! # Conversation Orchestrator
//!
//! One user turn end to end: prompt, completion, directive extraction and
//! per-action dispatch. A failing action never stops the others in the same
//! turn, and a failing engine turns into the fallback reply with no actions.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::engine::{complete_within, CompletionEngine};
use super::history::{ConversationHistory, ConversationTurn, Speaker};
use super::insights::{
    analyze_sentiment, parse_schedule_suggestions, suggestions_for, Sentiment, FALLBACK_INSIGHT,
    FALLBACK_REPLY, FALLBACK_SCHEDULE_SUGGESTIONS,
};
use super::prompt_builder::{daily_insight_prompt, schedule_prompt, PromptBuilder};
use crate::core::Clock;
use crate::features::actions::{
    Action, ActionExtractor, ActionIntent, ActionKind, CalendarIntent, DirectiveParser,
    GoalIntent, GoalRef, ReminderIntent, TaskIntent, DEFAULT_REMINDER_TIME,
};
use crate::features::habits::HabitTracker;
use crate::features::profile::ProfileManager;
use crate::features::reminders::{resolve_time, Reminder, ReminderId, ReminderScheduler};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub history_capacity: usize,
    pub completion_timeout: Duration,
    /// Offset for resolving wall-clock reminder times
    pub utc_offset: FixedOffset,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            completion_timeout: Duration::from_secs(30),
            utc_offset: crate::core::local_offset(),
        }
    }
}

/// Receives task and calendar actions, which live outside this crate
#[async_trait]
pub trait ActionCollaborator: Send + Sync {
    async fn create_task(&self, task: TaskIntent) -> anyhow::Result<()>;
    async fn create_calendar_event(&self, event: CalendarIntent) -> anyhow::Result<()>;
}

/// Collaborator that only logs what it receives
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCollaborator;

#[async_trait]
impl ActionCollaborator for LoggingCollaborator {
    async fn create_task(&self, task: TaskIntent) -> anyhow::Result<()> {
        info!("📝 Task '{}' ({}, {})", task.title, task.category, task.priority);
        Ok(())
    }

    async fn create_calendar_event(&self, event: CalendarIntent) -> anyhow::Result<()> {
        info!("📅 Event '{}' on {} ({})", event.title, event.date, event.event_type);
        Ok(())
    }
}

/// Result of dispatching one action
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    ReminderScheduled {
        id: ReminderId,
        title: String,
        at: DateTime<Utc>,
    },
    TaskForwarded {
        title: String,
    },
    EventForwarded {
        title: String,
    },
    GoalAdded {
        goal_id: String,
        title: String,
    },
    GoalProgress {
        goal_id: String,
        progress: u8,
    },
    MoodNoted {
        mood: Option<String>,
        level: Option<u8>,
    },
    Failed {
        kind: ActionKind,
        reason: String,
    },
}

impl DispatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    /// Reply with directives removed
    pub text: String,
    pub actions: Vec<Action>,
    /// One entry per action, same order
    pub outcomes: Vec<DispatchOutcome>,
    pub sentiment: Sentiment,
    pub suggestions: Vec<String>,
    /// True when the engine failed and `text` is the canned reply
    pub fallback: bool,
}

impl AssistantReply {
    fn fallback() -> Self {
        Self {
            text: FALLBACK_REPLY.to_string(),
            actions: Vec::new(),
            outcomes: Vec::new(),
            sentiment: Sentiment::Neutral,
            suggestions: Vec::new(),
            fallback: true,
        }
    }
}

pub struct ConversationOrchestrator {
    engine: Arc<dyn CompletionEngine>,
    parser: Box<dyn DirectiveParser>,
    scheduler: Arc<ReminderScheduler>,
    habits: Arc<HabitTracker>,
    profile: Arc<ProfileManager>,
    collaborator: Arc<dyn ActionCollaborator>,
    clock: Arc<dyn Clock>,
    history: Mutex<ConversationHistory>,
    mood: Mutex<String>,
    settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        engine: Arc<dyn CompletionEngine>,
        scheduler: Arc<ReminderScheduler>,
        habits: Arc<HabitTracker>,
        profile: Arc<ProfileManager>,
        collaborator: Arc<dyn ActionCollaborator>,
        clock: Arc<dyn Clock>,
        settings: OrchestratorSettings,
    ) -> Self {
        let mood = profile.snapshot().history.average_mood;
        Self {
            engine,
            parser: Box::new(ActionExtractor::new()),
            scheduler,
            habits,
            profile,
            collaborator,
            clock,
            history: Mutex::new(ConversationHistory::new(settings.history_capacity)),
            mood: Mutex::new(mood),
            settings,
        }
    }

    /// Swap the directive heuristic
    pub fn with_parser(mut self, parser: Box<dyn DirectiveParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn habits(&self) -> &Arc<HabitTracker> {
        &self.habits
    }

    pub fn current_mood(&self) -> String {
        self.mood.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_mood(&self, mood: &str) {
        *self.mood.lock().unwrap_or_else(|e| e.into_inner()) = mood.trim().to_string();
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        self.lock_history().turns().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.lock_history().clear();
        info!("Conversation history cleared");
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, ConversationHistory> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one user turn
    pub async fn process_message(&self, user_message: &str) -> AssistantReply {
        let user_message = user_message.trim();
        let now = self.clock.now();
        let profile = self.profile.snapshot();
        let mood = self.current_mood();

        let prompt = {
            let mut history = self.lock_history();
            let prompt = PromptBuilder::new(&profile)
                .with_mood(&mood)
                .with_transcript(&history.transcript())
                .build(user_message);
            history.push(Speaker::User, user_message, now);
            prompt
        };

        let raw = match complete_within(
            self.engine.as_ref(),
            &prompt,
            self.settings.completion_timeout,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Completion failed, using fallback reply: {}", e);
                return AssistantReply::fallback();
            }
        };

        let extraction = self.parser.extract(&raw);
        if !extraction.rejected.is_empty() {
            debug!("{} directive(s) rejected this turn", extraction.rejected.len());
        }

        self.lock_history()
            .push(Speaker::Assistant, extraction.display_text.clone(), self.clock.now());

        let mut outcomes = Vec::with_capacity(extraction.actions.len());
        for action in &extraction.actions {
            outcomes.push(self.dispatch(action).await);
        }

        let mood = self.current_mood();
        if let Err(e) = self
            .with_profile(move |profile| profile.track_interaction(Some(mood.as_str())))
            .await
        {
            warn!("Interaction not recorded: {}", e);
        }

        AssistantReply {
            text: extraction.display_text,
            actions: extraction.actions,
            outcomes,
            sentiment: analyze_sentiment(user_message),
            suggestions: suggestions_for(user_message),
            fallback: false,
        }
    }

    /// Route one action to its handler. Failures stay local to the action.
    pub async fn dispatch(&self, action: &Action) -> DispatchOutcome {
        let intent = match ActionIntent::try_from(action) {
            Ok(intent) => intent,
            Err(e) => {
                warn!("Skipping {} action: {}", action.kind, e);
                return DispatchOutcome::Failed {
                    kind: action.kind,
                    reason: e.to_string(),
                };
            }
        };

        let kind = intent.kind();
        let result = match intent {
            ActionIntent::Reminder(reminder) => self.schedule_reminder(reminder),
            ActionIntent::Task(task) => {
                let title = task.title.clone();
                self.collaborator
                    .create_task(task)
                    .await
                    .map(|()| DispatchOutcome::TaskForwarded { title })
                    .map_err(|e| e.to_string())
            }
            ActionIntent::Calendar(event) => {
                let title = event.title.clone();
                self.collaborator
                    .create_calendar_event(event)
                    .await
                    .map(|()| DispatchOutcome::EventForwarded { title })
                    .map_err(|e| e.to_string())
            }
            ActionIntent::Goal(goal) => self.apply_goal(goal).await,
            ActionIntent::Mood(m) => {
                if let Some(mood) = &m.mood {
                    self.set_mood(mood);
                }
                info!("Mood noted: {:?} (level {:?})", m.mood, m.level);
                Ok(DispatchOutcome::MoodNoted {
                    mood: m.mood,
                    level: m.level,
                })
            }
        };

        result.unwrap_or_else(|reason| {
            warn!("{} action failed: {}", kind, reason);
            DispatchOutcome::Failed { kind, reason }
        })
    }

    fn schedule_reminder(&self, intent: ReminderIntent) -> Result<DispatchOutcome, String> {
        let time = intent.time.as_deref().unwrap_or(DEFAULT_REMINDER_TIME);
        let at = resolve_time(time, self.clock.now(), self.settings.utc_offset)
            .map_err(|e| e.to_string())?;

        let mut reminder = Reminder::new(intent.title.clone(), at)
            .with_repeat(intent.repeat)
            .with_priority(intent.priority);
        if let Some(message) = intent.message {
            reminder = reminder.with_message(message);
        }

        let id = self.scheduler.schedule(reminder);
        Ok(DispatchOutcome::ReminderScheduled {
            id,
            title: intent.title,
            at,
        })
    }

    async fn apply_goal(&self, goal: GoalIntent) -> Result<DispatchOutcome, String> {
        match goal {
            GoalIntent::Add { title, deadline } => {
                let goal = self
                    .with_profile(move |profile| profile.add_goal(&title, deadline))
                    .await?;
                Ok(DispatchOutcome::GoalAdded {
                    goal_id: goal.id,
                    title: goal.title,
                })
            }
            GoalIntent::Progress { target, progress } => {
                let goal_id = match target {
                    GoalRef::Id(id) => id,
                    GoalRef::Title(title) => self
                        .profile
                        .snapshot()
                        .find_goal_by_title(&title)
                        .map(|g| g.id.clone())
                        .ok_or_else(|| format!("no goal titled '{title}'"))?,
                };
                let lookup = goal_id.clone();
                let goal = self
                    .with_profile(move |profile| profile.update_goal_progress(&lookup, progress))
                    .await?
                    .ok_or_else(|| format!("no goal with id '{goal_id}'"))?;
                Ok(DispatchOutcome::GoalProgress {
                    goal_id: goal.id,
                    progress: goal.progress,
                })
            }
        }
    }

    /// Run a profile mutation on the blocking pool; its save is file or SQLite I/O
    async fn with_profile<R, F>(&self, f: F) -> Result<R, String>
    where
        F: FnOnce(&ProfileManager) -> R + Send + 'static,
        R: Send + 'static,
    {
        let profile = Arc::clone(&self.profile);
        tokio::task::spawn_blocking(move || f(&profile))
            .await
            .map_err(|e| format!("profile update did not finish: {e}"))
    }

    /// Short motivational note, canned text when the engine fails
    pub async fn daily_insight(&self) -> String {
        let recent = self.lock_history().recent_user_messages(3);
        let prompt = daily_insight_prompt(&self.profile.snapshot(), &recent, &self.current_mood());

        match complete_within(self.engine.as_ref(), &prompt, self.settings.completion_timeout).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Daily insight unavailable: {}", e);
                FALLBACK_INSIGHT.to_string()
            }
        }
    }

    /// Three schedule tweaks, canned ones when the engine fails
    pub async fn schedule_suggestions(&self) -> Vec<String> {
        let prompt = schedule_prompt(&self.profile.snapshot());

        let parsed = match complete_within(self.engine.as_ref(), &prompt, self.settings.completion_timeout).await {
            Ok(text) => parse_schedule_suggestions(&text),
            Err(e) => {
                warn!("Schedule suggestions unavailable: {}", e);
                Vec::new()
            }
        };

        if parsed.is_empty() {
            FALLBACK_SCHEDULE_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            parsed
        }
    }
}
