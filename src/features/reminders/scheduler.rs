//! # Reminder Scheduler
//!
//! Owns every reminder, runs the periodic due-check sweep and applies user
//! transitions. Safe to share behind an `Arc` and call from any task while a
//! sweep is running.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Per-cycle delivery bookkeeping, concurrent timed deliveries, terminal eviction
//! - 1.0.0: Initial release

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use super::model::{Reminder, ReminderId, ReminderState};
use super::sink::{DeliveryError, NotificationSink};
use crate::core::Clock;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Period of the background sweep
    pub sweep_interval: Duration,
    /// Upper bound on a single sink call
    pub delivery_timeout: Duration,
    /// How long terminal reminders stay readable before eviction
    pub terminal_grace: chrono::Duration,
    /// Used by `snooze(id, None)`
    pub default_snooze: chrono::Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            delivery_timeout: Duration::from_secs(10),
            terminal_grace: chrono::Duration::minutes(5),
            default_snooze: chrono::Duration::minutes(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("reminder {0} not found")]
    NotFound(ReminderId),

    #[error("cannot {operation} reminder {id} while it is {state}")]
    InvalidTransition {
        id: ReminderId,
        operation: &'static str,
        state: ReminderState,
    },

    #[error("snooze duration must be positive and within range")]
    InvalidSnooze,
}

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Non-terminal reminders looked at
    pub evaluated: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Terminal reminders dropped after their grace period
    pub evicted: usize,
}

pub struct ReminderScheduler {
    reminders: DashMap<ReminderId, Reminder>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    /// Serializes sweeps so a manual sweep never races the background loop
    sweep_lock: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            reminders: DashMap::new(),
            sink,
            clock,
            settings,
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Register a reminder. Lifecycle fields are reset to a fresh `Scheduled` cycle.
    ///
    /// Rescheduling a known id starts a new cycle, so a delivery still in
    /// flight for the old one is ignored.
    pub fn schedule(&self, mut reminder: Reminder) -> ReminderId {
        reminder.state = ReminderState::Scheduled;
        reminder.snoozed_until = None;
        reminder.delivered_this_cycle = false;
        reminder.terminal_at = None;

        let id = reminder.id.clone();
        info!(
            "Scheduled reminder {} '{}' for {} ({})",
            id, reminder.title, reminder.scheduled_time, reminder.repeat
        );
        match self.reminders.entry(id.clone()) {
            Entry::Occupied(mut existing) => {
                reminder.cycle = existing.get().cycle + 1;
                existing.insert(reminder);
            }
            Entry::Vacant(slot) => {
                reminder.cycle = 0;
                slot.insert(reminder);
            }
        }
        id
    }

    /// Defer a reminder. Only valid while `Scheduled`, delivered or not.
    ///
    /// `None` uses the configured default snooze.
    pub fn snooze(
        &self,
        id: &str,
        duration: Option<chrono::Duration>,
    ) -> Result<Reminder, SchedulerError> {
        let duration = duration.unwrap_or(self.settings.default_snooze);
        if duration <= chrono::Duration::zero() {
            return Err(SchedulerError::InvalidSnooze);
        }

        let until = self
            .clock
            .now()
            .checked_add_signed(duration)
            .ok_or(SchedulerError::InvalidSnooze)?;
        let mut reminder = self
            .reminders
            .get_mut(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;

        if reminder.state != ReminderState::Scheduled {
            return Err(SchedulerError::InvalidTransition {
                id: id.to_string(),
                operation: "snooze",
                state: reminder.state,
            });
        }

        reminder.state = ReminderState::Snoozed;
        reminder.snoozed_until = Some(until);
        reminder.delivered_this_cycle = false;
        reminder.cycle += 1;

        info!("Snoozed reminder {} until {}", id, until);
        Ok(reminder.clone())
    }

    /// Acknowledge a reminder. Repeating reminders roll to their next
    /// occurrence; one-shot reminders become terminal.
    pub fn complete(&self, id: &str) -> Result<Reminder, SchedulerError> {
        let now = self.clock.now();
        let mut reminder = self.active_entry(id, "complete")?;

        reminder.snoozed_until = None;
        reminder.delivered_this_cycle = false;
        reminder.cycle += 1;

        match reminder.repeat.advance(reminder.scheduled_time) {
            Some(next) => {
                reminder.scheduled_time = next;
                reminder.state = ReminderState::Scheduled;
                info!("Completed reminder {}, next occurrence {}", id, next);
            }
            None => {
                if reminder.repeat.is_repeating() {
                    warn!("Reminder {} cannot advance past {}", id, reminder.scheduled_time);
                }
                reminder.state = ReminderState::Completed;
                reminder.terminal_at = Some(now);
                info!("Completed reminder {}", id);
            }
        }

        Ok(reminder.clone())
    }

    /// Stop a reminder for good. It stays readable until the grace period ends.
    pub fn dismiss(&self, id: &str) -> Result<Reminder, SchedulerError> {
        let now = self.clock.now();
        let mut reminder = self.active_entry(id, "dismiss")?;

        reminder.state = ReminderState::Dismissed;
        reminder.snoozed_until = None;
        reminder.terminal_at = Some(now);
        reminder.cycle += 1;

        info!("Dismissed reminder {}", id);
        Ok(reminder.clone())
    }

    fn active_entry(
        &self,
        id: &str,
        operation: &'static str,
    ) -> Result<dashmap::mapref::one::RefMut<'_, ReminderId, Reminder>, SchedulerError> {
        let reminder = self
            .reminders
            .get_mut(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;

        if reminder.is_terminal() {
            return Err(SchedulerError::InvalidTransition {
                id: id.to_string(),
                operation,
                state: reminder.state,
            });
        }
        Ok(reminder)
    }

    pub fn get(&self, id: &str) -> Option<Reminder> {
        self.reminders.get(id).map(|r| r.clone())
    }

    /// Non-terminal reminders, soonest first
    pub fn list_active(&self) -> Vec<Reminder> {
        let mut active: Vec<Reminder> = self
            .reminders
            .iter()
            .filter(|r| !r.is_terminal())
            .map(|r| r.clone())
            .collect();
        active.sort_by_key(|r| r.next_trigger());
        active
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// One due-check pass.
    ///
    /// Wakes elapsed snoozes, hands every undelivered due reminder to the
    /// sink concurrently (each call bounded by the delivery timeout), then
    /// records the outcomes. Failed or timed-out deliveries stay due.
    pub async fn sweep(&self) -> SweepReport {
        let _guard = self.sweep_lock.lock().await;
        let now = self.clock.now();
        let mut report = SweepReport {
            evicted: self.evict_expired(now),
            ..SweepReport::default()
        };

        let mut due = Vec::new();
        for mut entry in self.reminders.iter_mut() {
            let reminder = entry.value_mut();
            if reminder.is_terminal() {
                continue;
            }
            report.evaluated += 1;

            if reminder.state == ReminderState::Snoozed
                && reminder.snoozed_until.map_or(true, |until| until <= now)
            {
                debug!("Snooze elapsed for reminder {}", reminder.id);
                reminder.state = ReminderState::Scheduled;
                reminder.snoozed_until = None;
            }

            if reminder.is_due(now) && !reminder.delivered_this_cycle {
                due.push(reminder.clone());
            }
        }

        if due.is_empty() {
            return report;
        }

        let timeout = self.settings.delivery_timeout;
        let mut deliveries = JoinSet::new();
        for reminder in due {
            let sink = Arc::clone(&self.sink);
            deliveries.spawn(async move {
                let result = match tokio::time::timeout(timeout, sink.deliver(&reminder)).await {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::TimedOut(timeout)),
                };
                (reminder.id, reminder.cycle, result)
            });
        }

        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok((id, cycle, Ok(()))) => {
                    report.delivered += 1;
                    self.mark_delivered(&id, cycle);
                }
                Ok((id, _, Err(e))) => {
                    report.failed += 1;
                    warn!("Delivery failed for reminder {}, will retry: {}", id, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Delivery task panicked: {}", e);
                }
            }
        }

        report
    }

    fn mark_delivered(&self, id: &str, cycle: u64) {
        if let Some(mut reminder) = self.reminders.get_mut(id) {
            // A transition during delivery started a new cycle
            if reminder.cycle == cycle && !reminder.is_terminal() {
                reminder.delivered_this_cycle = true;
                info!("Delivered reminder {} '{}'", id, reminder.title);
            } else {
                debug!("Ignoring stale delivery result for reminder {}", id);
            }
        }
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let grace = self.settings.terminal_grace;
        let before = self.reminders.len();
        self.reminders.retain(|_, r| {
            !(r.is_terminal() && r.terminal_at.map_or(true, |at| now - at >= grace))
        });
        let evicted = before.saturating_sub(self.reminders.len());
        if evicted > 0 {
            debug!("Evicted {} terminal reminder(s)", evicted);
        }
        evicted
    }

    /// Spawn the periodic sweep loop
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move { scheduler.run_until_shutdown(receiver).await });
        SchedulerHandle { shutdown, task }
    }

    async fn run_until_shutdown(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.settings.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Reminder scheduler started (sweep every {:?})",
            self.settings.sweep_interval
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let report = self.sweep().await;
                    debug!("Sweep finished: {:?}", report);
                }
            }
        }

        info!("Reminder scheduler stopped");
    }
}

/// Handle to the background sweep loop. Dropping it also stops the loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop sweeping and wait for the sweep in progress, if any, to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Reminder scheduler task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::features::reminders::model::RepeatRule;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        delivered: StdMutex<Vec<String>>,
        offline: AtomicBool,
    }

    impl RecordingSink {
        fn titles(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, reminder: &Reminder) -> Result<(), DeliveryError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(DeliveryError::Offline("test".to_string()));
            }
            if reminder.title == "slow" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.delivered.lock().unwrap().push(reminder.title.clone());
            Ok(())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn setup() -> (Arc<ReminderScheduler>, Arc<RecordingSink>, Arc<ManualClock>) {
        setup_with(SchedulerSettings::default())
    }

    fn setup_with(
        settings: SchedulerSettings,
    ) -> (Arc<ReminderScheduler>, Arc<RecordingSink>, Arc<ManualClock>) {
        let sink = Arc::new(RecordingSink::default());
        let clock = Arc::new(ManualClock::new(start()));
        let scheduler = Arc::new(ReminderScheduler::new(sink.clone(), clock.clone(), settings));
        (scheduler, sink, clock)
    }

    #[tokio::test]
    async fn test_due_reminder_delivered_once_per_cycle() {
        let (scheduler, sink, clock) = setup();
        scheduler.schedule(Reminder::new("Drink water", start()));

        let report = scheduler.sweep().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evaluated, 1);

        clock.advance(chrono::Duration::seconds(30));
        let report = scheduler.sweep().await;
        assert_eq!(report.delivered, 0);
        assert_eq!(sink.titles(), vec!["Drink water"]);
    }

    #[tokio::test]
    async fn test_future_reminder_waits() {
        let (scheduler, sink, clock) = setup();
        let id = scheduler.schedule(Reminder::new("Later", start() + chrono::Duration::hours(1)));

        scheduler.sweep().await;
        assert!(sink.titles().is_empty());

        clock.advance(chrono::Duration::hours(1));
        scheduler.sweep().await;
        assert_eq!(sink.titles(), vec!["Later"]);
        assert!(scheduler.get(&id).unwrap().delivered_this_cycle);
    }

    #[tokio::test]
    async fn test_snooze_defers_then_redelivers_once() {
        let (scheduler, sink, clock) = setup();
        let id = scheduler.schedule(Reminder::new("Stretch", start()));
        scheduler.sweep().await;
        assert_eq!(sink.titles().len(), 1);

        let snoozed = scheduler
            .snooze(&id, Some(chrono::Duration::minutes(5)))
            .unwrap();
        assert_eq!(snoozed.state, ReminderState::Snoozed);
        assert!(!snoozed.delivered_this_cycle);

        clock.advance(chrono::Duration::minutes(4));
        scheduler.sweep().await;
        assert_eq!(sink.titles().len(), 1);

        clock.advance(chrono::Duration::minutes(1));
        scheduler.sweep().await;
        scheduler.sweep().await;
        assert_eq!(sink.titles().len(), 2);
        assert_eq!(scheduler.get(&id).unwrap().state, ReminderState::Scheduled);
    }

    #[tokio::test]
    async fn test_snooze_default_duration() {
        let (scheduler, _sink, _clock) = setup();
        let id = scheduler.schedule(Reminder::new("Stretch", start()));

        let snoozed = scheduler.snooze(&id, None).unwrap();
        assert_eq!(snoozed.snoozed_until, Some(start() + chrono::Duration::minutes(5)));
    }

    #[tokio::test]
    async fn test_snooze_rejections() {
        let (scheduler, _sink, _clock) = setup();
        let id = scheduler.schedule(Reminder::new("Stretch", start()));

        assert_eq!(
            scheduler.snooze(&id, Some(chrono::Duration::zero())),
            Err(SchedulerError::InvalidSnooze)
        );

        scheduler.snooze(&id, None).unwrap();
        assert!(matches!(
            scheduler.snooze(&id, None),
            Err(SchedulerError::InvalidTransition {
                state: ReminderState::Snoozed,
                ..
            })
        ));

        scheduler.dismiss(&id).unwrap();
        assert!(matches!(
            scheduler.snooze(&id, None),
            Err(SchedulerError::InvalidTransition { .. })
        ));
        assert_eq!(
            scheduler.snooze("missing", None),
            Err(SchedulerError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_complete_once_is_terminal() {
        let (scheduler, _sink, _clock) = setup();
        let id = scheduler.schedule(Reminder::new("Call mom", start()));

        let done = scheduler.complete(&id).unwrap();
        assert_eq!(done.state, ReminderState::Completed);
        assert!(scheduler.list_active().is_empty());
        assert!(scheduler.complete(&id).is_err());
        assert!(scheduler.dismiss(&id).is_err());
    }

    #[tokio::test]
    async fn test_complete_daily_advances_one_day() {
        let (scheduler, sink, clock) = setup();
        let t = start() + chrono::Duration::hours(5);
        let id = scheduler.schedule(Reminder::new("Vitamins", t).with_repeat(RepeatRule::Daily));

        clock.set(t);
        scheduler.sweep().await;
        let next = scheduler.complete(&id).unwrap();

        assert_eq!(next.scheduled_time, t + chrono::Duration::hours(24));
        assert_eq!(next.state, ReminderState::Scheduled);
        assert!(!next.delivered_this_cycle);

        clock.set(t + chrono::Duration::hours(24));
        scheduler.sweep().await;
        assert_eq!(sink.titles().len(), 2);
    }

    #[tokio::test]
    async fn test_complete_weekly_and_monthly() {
        let (scheduler, _sink, _clock) = setup();
        let weekly = scheduler.schedule(Reminder::new("Review", start()).with_repeat(RepeatRule::Weekly));
        let monthly =
            scheduler.schedule(Reminder::new("Budget", start()).with_repeat(RepeatRule::Monthly));

        assert_eq!(
            scheduler.complete(&weekly).unwrap().scheduled_time,
            start() + chrono::Duration::days(7)
        );
        assert_eq!(
            scheduler.complete(&monthly).unwrap().scheduled_time,
            Utc.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_completing_snoozed_repeating_reminder_clears_snooze() {
        let (scheduler, _sink, _clock) = setup();
        let id = scheduler.schedule(Reminder::new("Walk", start()).with_repeat(RepeatRule::Daily));
        scheduler.snooze(&id, None).unwrap();

        let next = scheduler.complete(&id).unwrap();
        assert_eq!(next.state, ReminderState::Scheduled);
        assert_eq!(next.snoozed_until, None);
    }

    #[tokio::test]
    async fn test_dismissed_never_swept_and_evicted_after_grace() {
        let (scheduler, sink, clock) = setup();
        let id = scheduler.schedule(Reminder::new("Nope", start() + chrono::Duration::minutes(1)));
        scheduler.dismiss(&id).unwrap();

        clock.advance(chrono::Duration::minutes(2));
        let report = scheduler.sweep().await;
        assert_eq!(report.evaluated, 0);
        assert_eq!(report.evicted, 0);
        assert!(sink.titles().is_empty());
        assert_eq!(scheduler.get(&id).unwrap().state, ReminderState::Dismissed);

        clock.advance(chrono::Duration::minutes(5));
        let report = scheduler.sweep().await;
        assert_eq!(report.evicted, 1);
        assert!(scheduler.get(&id).is_none());
        assert!(sink.titles().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_retried_next_sweep() {
        let (scheduler, sink, clock) = setup();
        let id = scheduler.schedule(Reminder::new("Meds", start()));

        sink.offline.store(true, Ordering::SeqCst);
        let report = scheduler.sweep().await;
        assert_eq!(report.failed, 1);
        assert!(!scheduler.get(&id).unwrap().delivered_this_cycle);

        sink.offline.store(false, Ordering::SeqCst);
        clock.advance(chrono::Duration::seconds(30));
        let report = scheduler.sweep().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(sink.titles(), vec!["Meds"]);
    }

    #[tokio::test]
    async fn test_slow_sink_times_out_without_blocking_others() {
        let (scheduler, sink, _clock) = setup_with(SchedulerSettings {
            delivery_timeout: Duration::from_millis(50),
            ..SchedulerSettings::default()
        });
        let slow = scheduler.schedule(Reminder::new("slow", start()));
        scheduler.schedule(Reminder::new("fast", start()));

        let report = scheduler.sweep().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(sink.titles(), vec!["fast"]);
        assert!(!scheduler.get(&slow).unwrap().delivered_this_cycle);
    }

    #[tokio::test]
    async fn test_list_active_sorted_by_next_trigger() {
        let (scheduler, _sink, _clock) = setup();
        scheduler.schedule(Reminder::new("b", start() + chrono::Duration::hours(2)));
        let a = scheduler.schedule(Reminder::new("a", start() + chrono::Duration::hours(3)));
        scheduler.schedule(Reminder::new("c", start() + chrono::Duration::hours(1)));
        let gone = scheduler.schedule(Reminder::new("gone", start()));
        scheduler.dismiss(&gone).unwrap();

        // Snoozing "a" pulls it ahead of everything
        scheduler.snooze(&a, Some(chrono::Duration::minutes(1))).unwrap();

        let titles: Vec<String> = scheduler.list_active().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);
        assert_eq!(scheduler.len(), 4);
    }

    #[tokio::test]
    async fn test_background_loop_delivers_and_shuts_down() {
        let (scheduler, sink, _clock) = setup_with(SchedulerSettings {
            sweep_interval: Duration::from_millis(10),
            ..SchedulerSettings::default()
        });
        scheduler.schedule(Reminder::new("Ping", start()));

        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert_eq!(sink.titles(), vec!["Ping"]);

        // No sweeps after shutdown
        scheduler.schedule(Reminder::new("After", start()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.titles(), vec!["Ping"]);
    }

    /// Holds the first delivery until the test releases it
    #[derive(Default)]
    struct GatedSink {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
        armed: AtomicBool,
        delivered: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for GatedSink {
        async fn deliver(&self, reminder: &Reminder) -> Result<(), DeliveryError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.started.notify_one();
                self.release.notified().await;
            }
            self.delivered.lock().unwrap().push(reminder.title.clone());
            Ok(())
        }
    }

    fn gated_setup() -> (Arc<ReminderScheduler>, Arc<GatedSink>, Arc<ManualClock>) {
        let sink = Arc::new(GatedSink::default());
        sink.armed.store(true, Ordering::SeqCst);
        let clock = Arc::new(ManualClock::new(start()));
        let scheduler = Arc::new(ReminderScheduler::new(
            sink.clone(),
            clock.clone(),
            SchedulerSettings::default(),
        ));
        (scheduler, sink, clock)
    }

    /// Starts a sweep in the background and waits until its delivery is pending
    async fn sweep_in_flight(
        scheduler: &Arc<ReminderScheduler>,
        sink: &GatedSink,
    ) -> JoinHandle<SweepReport> {
        let sweeping = Arc::clone(scheduler);
        let task = tokio::spawn(async move { sweeping.sweep().await });
        sink.started.notified().await;
        task
    }

    #[tokio::test]
    async fn test_complete_during_delivery_starts_fresh_cycle() {
        let (scheduler, sink, clock) = gated_setup();
        let id = scheduler.schedule(Reminder::new("Vitamins", start()).with_repeat(RepeatRule::Daily));

        let sweep = sweep_in_flight(&scheduler, &sink).await;
        let next = scheduler.complete(&id).unwrap();
        sink.release.notify_one();
        let report = sweep.await.unwrap();

        assert_eq!(report.delivered, 1);
        let reminder = scheduler.get(&id).unwrap();
        assert_eq!(reminder.scheduled_time, next.scheduled_time);
        assert!(!reminder.delivered_this_cycle);

        clock.set(next.scheduled_time);
        assert_eq!(scheduler.sweep().await.delivered, 1);
        assert_eq!(scheduler.sweep().await.delivered, 0);
        assert_eq!(sink.delivered.lock().unwrap().len(), 2);
        assert!(scheduler.get(&id).unwrap().delivered_this_cycle);
    }

    #[tokio::test]
    async fn test_snooze_during_delivery_redelivers_after_snooze() {
        let (scheduler, sink, clock) = gated_setup();
        let id = scheduler.schedule(Reminder::new("Stretch", start()));

        let sweep = sweep_in_flight(&scheduler, &sink).await;
        scheduler.snooze(&id, Some(chrono::Duration::minutes(5))).unwrap();
        sink.release.notify_one();
        sweep.await.unwrap();

        let reminder = scheduler.get(&id).unwrap();
        assert_eq!(reminder.state, ReminderState::Snoozed);
        assert!(!reminder.delivered_this_cycle);

        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(scheduler.sweep().await.delivered, 1);
        assert_eq!(scheduler.sweep().await.delivered, 0);
        assert_eq!(sink.delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dismiss_during_delivery_stays_dismissed() {
        let (scheduler, sink, _clock) = gated_setup();
        let id = scheduler.schedule(Reminder::new("Nope", start()));

        let sweep = sweep_in_flight(&scheduler, &sink).await;
        scheduler.dismiss(&id).unwrap();
        sink.release.notify_one();
        sweep.await.unwrap();

        let reminder = scheduler.get(&id).unwrap();
        assert_eq!(reminder.state, ReminderState::Dismissed);
        assert!(!reminder.delivered_this_cycle);
        assert_eq!(scheduler.sweep().await.delivered, 0);
    }

    #[tokio::test]
    async fn test_reschedule_during_delivery_ignores_stale_result() {
        let (scheduler, sink, _clock) = gated_setup();
        let reminder = Reminder::new("Call", start());
        let id = scheduler.schedule(reminder.clone());

        let sweep = sweep_in_flight(&scheduler, &sink).await;
        scheduler.schedule(reminder);
        sink.release.notify_one();
        sweep.await.unwrap();

        assert!(!scheduler.get(&id).unwrap().delivered_this_cycle);
        assert_eq!(scheduler.sweep().await.delivered, 1);
        assert_eq!(sink.delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_snooze_out_of_range_is_rejected() {
        let (scheduler, _sink, _clock) = setup();
        let id = scheduler.schedule(Reminder::new("Stretch", start()));

        assert_eq!(
            scheduler.snooze(&id, Some(chrono::Duration::weeks(26_000_000))),
            Err(SchedulerError::InvalidSnooze)
        );
        assert_eq!(scheduler.get(&id).unwrap().state, ReminderState::Scheduled);
    }
}
