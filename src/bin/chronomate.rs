use anyhow::Result;
use chrono::Timelike;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use chronomate::core::{Clock, Config, SystemClock};
use chronomate::features::conversation::{
    ConversationOrchestrator, DispatchOutcome, LoggingCollaborator, OpenAiCompletionEngine,
};
use chronomate::features::habits::HabitTracker;
use chronomate::features::notifications::{self, HealthReminder, NoticeWatch};
use chronomate::features::profile::{open_store, MemoryProfileStore, ProfileManager, ProfileStore};
use chronomate::features::reminders::time::describe_until;
use chronomate::features::reminders::{
    resolve_time, ChannelSink, Reminder, ReminderScheduler, RepeatRule,
};

const HELP: &str = "Commands:
  /reminders              list active reminders
  /done <id>              complete a reminder (counts as a finished task)
  /snooze <id> [minutes]  snooze a reminder
  /dismiss <id>           dismiss a reminder
  /habit <name>           log a habit completion
  /habits                 show habit streaks
  /goals                  show goals
  /health <kind> [time]   daily health reminder (water, exercise, break, meditation)
  /mood [mood]            set or check in on your mood
  /insight                daily insight
  /schedule               schedule suggestions
  /reflect                evening reflection on finished tasks
  /forget                 clear conversation history
  /quit                   exit
Anything else is sent to ChronoMate.";

struct App {
    config: Config,
    clock: Arc<dyn Clock>,
    scheduler: Arc<ReminderScheduler>,
    habits: Arc<HabitTracker>,
    profile: Arc<ProfileManager>,
    orchestrator: ConversationOrchestrator,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // The openai crate reads its key from the environment
    std::env::set_var("OPENAI_API_KEY", &config.openai_api_key);
    std::env::set_var("OPENAI_KEY", &config.openai_api_key);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting ChronoMate...");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Box<dyn ProfileStore> = match open_store(config.profile_backend, &config.profile_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(
                "Could not open {} profile store at {}, keeping profile in memory: {}",
                config.profile_backend, config.profile_path, e
            );
            Box::new(MemoryProfileStore::default())
        }
    };
    let profile = Arc::new(ProfileManager::load(store, clock.clone()));

    let (sink, mut deliveries) = ChannelSink::channel();
    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::new(sink),
        clock.clone(),
        config.scheduler_settings(),
    ));
    let scheduler_handle = scheduler.start();

    tokio::spawn(async move {
        while let Some(reminder) = deliveries.recv().await {
            println!(
                "\n⏰ {} ({})\n   {}\n   /done {} or /snooze {}",
                reminder.title,
                reminder.priority,
                reminder.message,
                short_id(&reminder.id),
                short_id(&reminder.id)
            );
        }
    });

    let habits = Arc::new(HabitTracker::new(
        profile.clone(),
        clock.clone(),
        config.streak_policy,
        config.utc_offset,
    ));

    if config.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; replies will use the fallback message");
    }
    let orchestrator = ConversationOrchestrator::new(
        Arc::new(OpenAiCompletionEngine::new(config.openai_model.clone())),
        scheduler.clone(),
        habits.clone(),
        profile.clone(),
        Arc::new(LoggingCollaborator),
        clock.clone(),
        config.orchestrator_settings(),
    );

    let app = App {
        config,
        clock,
        scheduler,
        habits,
        profile,
        orchestrator,
    };
    app.greet();

    let mut watch = NoticeWatch::new(app.clock.now());
    let mut ticks = tokio::time::interval(Duration::from_secs(60));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                for notice in watch.check(app.clock.now(), &app.scheduler.list_active()) {
                    println!("\n{notice}");
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        watch.record_input(app.clock.now());
                        if !app.handle_line(line.trim()).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }

    scheduler_handle.shutdown().await;
    info!("ChronoMate stopped");
    Ok(())
}

impl App {
    fn greet(&self) {
        let profile = self.profile.snapshot();
        let local_hour = self.clock.now().with_timezone(&self.config.utc_offset).hour();
        if (5..12).contains(&local_hour) {
            println!(
                "{}",
                notifications::morning_greeting(&profile.name, self.scheduler.list_active().len())
            );
        } else {
            println!("Hi {}! I'm ChronoMate. Type /help for commands.", profile.name);
        }
    }

    /// Returns false when the user asked to quit
    async fn handle_line(&self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "/quit" | "/exit" => return false,
            "/help" => println!("{HELP}"),
            "/reminders" => self.list_reminders(),
            "/done" => self.with_reminder(rest, |id| self.scheduler.complete(id).map(|r| {
                self.profile.complete_task();
                if r.is_terminal() {
                    format!("✅ Completed '{}'", r.title)
                } else {
                    format!("✅ Completed '{}', next one {}", r.title, r.scheduled_time)
                }
            })),
            "/dismiss" => self.with_reminder(rest, |id| {
                self.scheduler
                    .dismiss(id)
                    .map(|r| format!("🗑️ Dismissed '{}'", r.title))
            }),
            "/snooze" => {
                let (target, minutes) = rest.split_once(' ').unwrap_or((rest, ""));
                let duration = match minutes.trim() {
                    "" => None,
                    m => match m.parse::<i64>().ok().and_then(chrono::Duration::try_minutes) {
                        Some(d) => Some(d),
                        None => {
                            println!("Snooze length must be a number of minutes");
                            return true;
                        }
                    },
                };
                self.with_reminder(target, |id| {
                    self.scheduler.snooze(id, duration).map(|r| {
                        let until = r.snoozed_until.unwrap_or(r.scheduled_time);
                        format!("😴 Snoozed '{}' {}", r.title, describe_until(until, self.clock.now()))
                    })
                })
            }
            "/habit" => self.log_habit(rest),
            "/habits" => self.list_habits(),
            "/goals" => self.list_goals(),
            "/health" => self.schedule_health(rest),
            "/mood" => {
                if rest.is_empty() {
                    println!("{}", notifications::mood_check_in());
                } else {
                    self.orchestrator.set_mood(rest);
                    self.profile.track_interaction(Some(rest));
                    println!("Noted, you're feeling {rest}.");
                }
            }
            "/insight" => println!("🌟 {}", self.orchestrator.daily_insight().await),
            "/schedule" => {
                for (i, s) in self.orchestrator.schedule_suggestions().await.iter().enumerate() {
                    println!("{}. {}", i + 1, s);
                }
            }
            "/reflect" => self.reflect(),
            "/forget" => {
                self.orchestrator.clear_history();
                println!("Conversation history cleared.");
            }
            _ if command.starts_with('/') => println!("Unknown command. Type /help."),
            _ => self.chat(line).await,
        }
        true
    }

    async fn chat(&self, message: &str) {
        let reply = self.orchestrator.process_message(message).await;
        println!("\nChronoMate: {}", reply.text);

        for outcome in &reply.outcomes {
            match outcome {
                DispatchOutcome::ReminderScheduled { id, title, at } => println!(
                    "  ⏰ Reminder '{}' {} [{}]",
                    title,
                    describe_until(*at, self.clock.now()),
                    short_id(id)
                ),
                DispatchOutcome::TaskForwarded { title } => println!("  📝 Task '{title}' added"),
                DispatchOutcome::EventForwarded { title } => println!("  📅 Event '{title}' added"),
                DispatchOutcome::GoalAdded { title, .. } => println!("  🎯 Goal '{title}' added"),
                DispatchOutcome::GoalProgress { progress, .. } => {
                    println!("  🎯 Goal progress set to {progress}%")
                }
                DispatchOutcome::MoodNoted { .. } => {}
                DispatchOutcome::Failed { kind, reason } => {
                    println!("  ⚠️ Couldn't handle {kind} action: {reason}")
                }
            }
        }

        if !reply.fallback && !reply.suggestions.is_empty() {
            println!("  💡 {}", reply.suggestions.join(" · "));
        }
    }

    fn list_reminders(&self) {
        let active = self.scheduler.list_active();
        if active.is_empty() {
            println!("No active reminders.");
            return;
        }
        let now = self.clock.now();
        for r in active {
            println!(
                "[{}] {} ({}, {}) {}",
                short_id(&r.id),
                r.title,
                r.state,
                r.repeat,
                describe_until(r.next_trigger(), now)
            );
        }
    }

    fn with_reminder<F>(&self, prefix: &str, action: F)
    where
        F: FnOnce(&str) -> Result<String, chronomate::features::reminders::SchedulerError>,
    {
        let matches: Vec<Reminder> = self
            .scheduler
            .list_active()
            .into_iter()
            .filter(|r| !prefix.is_empty() && r.id.starts_with(prefix))
            .collect();

        match matches.as_slice() {
            [reminder] => match action(&reminder.id) {
                Ok(message) => println!("{message}"),
                Err(e) => println!("⚠️ {e}"),
            },
            [] => println!("No active reminder matches '{prefix}'"),
            _ => println!("'{prefix}' matches several reminders; use more of the id"),
        }
    }

    /// Finished tasks against those still open
    fn reflect(&self) {
        let completed = self.profile.snapshot().history.completed_tasks as usize;
        let total = completed + self.scheduler.list_active().len();
        println!("{}", notifications::evening_reflection(completed, total));
    }

    fn log_habit(&self, name: &str) {
        if name.is_empty() {
            println!("Usage: /habit <name>");
            return;
        }
        let completion = self.habits.add_completion(name);
        println!(
            "✔️ {} (done {} times, {}-day streak)",
            completion.habit.name, completion.habit.count, completion.habit.streak
        );
        if let Some(days) = completion.milestone {
            println!("{}", notifications::streak_celebration(days));
        }
    }

    fn list_habits(&self) {
        let habits = self.habits.habits();
        if habits.is_empty() {
            println!("No habits yet. Try /habit water");
            return;
        }
        for h in habits {
            println!("{}: {} total, {}-day streak", h.name, h.count, h.streak);
        }
    }

    fn list_goals(&self) {
        let profile = self.profile.snapshot();
        if profile.goals.is_empty() {
            println!("No goals yet.");
            return;
        }
        for g in &profile.goals {
            let deadline = g.deadline.map(|d| format!(" by {d}")).unwrap_or_default();
            println!("🎯 {} {}%{}", g.title, g.progress, deadline);
        }
    }

    fn schedule_health(&self, args: &str) {
        let (kind, time) = args.split_once(' ').unwrap_or((args, "1h"));
        let kind: HealthReminder = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        let now = self.clock.now();
        let at = match resolve_time(time, now, self.config.utc_offset) {
            Ok(at) => at,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        let id = self.scheduler.schedule(kind.reminder(at, RepeatRule::Daily));
        println!(
            "{} scheduled daily, first {} [{}]",
            kind.notice().title,
            describe_until(at, now),
            short_id(&id)
        );
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
