//! Shared, persisted profile access
//!
//! Every mutation goes through `update`, which saves the new state
//! synchronously. Store failures never reach callers: the first one is logged
//! and the profile keeps working in memory. A profile that could not be read
//! is never written back, so a damaged file stays as it was.

use chrono::NaiveDate;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::model::{Goal, UserProfile};
use super::store::ProfileStore;
use crate::core::Clock;

pub struct ProfileManager {
    profile: Mutex<UserProfile>,
    store: Box<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    store_failed: AtomicBool,
    /// Set when loading failed; saves are skipped for the whole session
    memory_only: bool,
}

impl ProfileManager {
    /// Load the saved profile, or start from defaults
    pub fn load(store: Box<dyn ProfileStore>, clock: Arc<dyn Clock>) -> Self {
        let (profile, memory_only) = match store.load() {
            Ok(Some(profile)) => {
                info!("Loaded profile for {}", profile.name);
                (profile, false)
            }
            Ok(None) => (UserProfile::default(), false),
            Err(e) => {
                warn!(
                    "Could not load profile, using defaults in memory only and leaving the stored copy untouched: {}",
                    e
                );
                (UserProfile::default(), true)
            }
        };

        Self {
            profile: Mutex::new(profile),
            store,
            clock,
            store_failed: AtomicBool::new(memory_only),
            memory_only,
        }
    }

    pub fn snapshot(&self) -> UserProfile {
        self.lock().clone()
    }

    /// True while changes are not reaching the store
    pub fn is_degraded(&self) -> bool {
        self.store_failed.load(Ordering::SeqCst)
    }

    /// Apply `f` to the profile and persist the result
    pub fn update<R>(&self, f: impl FnOnce(&mut UserProfile) -> R) -> R {
        let mut profile = self.lock();
        let result = f(&mut profile);
        self.persist(&profile);
        result
    }

    fn persist(&self, profile: &UserProfile) {
        if self.memory_only {
            return;
        }
        match self.store.save(profile) {
            Ok(()) => {
                if self.store_failed.swap(false, Ordering::SeqCst) {
                    info!("Profile store is writable again");
                }
            }
            Err(e) => {
                if !self.store_failed.swap(true, Ordering::SeqCst) {
                    warn!("Profile save failed, continuing in memory only: {}", e);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UserProfile> {
        self.profile.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count an interaction and remember the latest mood
    pub fn track_interaction(&self, mood: Option<&str>) {
        let now = self.clock.now();
        self.update(|p| {
            p.history.interactions += 1;
            if let Some(mood) = mood.map(str::trim).filter(|m| !m.is_empty()) {
                p.history.average_mood = mood.to_string();
            }
            p.history.last_active = now;
        });
    }

    pub fn add_goal(&self, title: &str, deadline: Option<NaiveDate>) -> Goal {
        let goal = Goal {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            progress: 0,
            deadline,
            created_at: self.clock.now(),
        };
        info!("Added goal '{}'", goal.title);
        self.update(|p| p.goals.push(goal.clone()));
        goal
    }

    /// Set progress (clamped to 100); `None` when no goal has that id
    pub fn update_goal_progress(&self, goal_id: &str, progress: u8) -> Option<Goal> {
        self.update(|p| {
            let goal = p.goals.iter_mut().find(|g| g.id == goal_id)?;
            goal.progress = progress.min(100);
            Some(goal.clone())
        })
    }

    pub fn complete_task(&self) {
        self.update(|p| p.history.completed_tasks += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::features::profile::store::{JsonFileProfileStore, MemoryProfileStore, StoreError};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;

    /// Fails every save, counts attempts
    #[derive(Default)]
    struct BrokenStore {
        saves: AtomicUsize,
        unreadable: bool,
    }

    impl ProfileStore for BrokenStore {
        fn load(&self) -> Result<Option<UserProfile>, StoreError> {
            if self.unreadable {
                return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")));
            }
            Ok(None)
        }

        fn save(&self, _profile: &UserProfile) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")))
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()))
    }

    #[test]
    fn test_mutations_are_saved() {
        let store = Arc::new(MemoryProfileStore::default());
        let manager = ProfileManager::load(Box::new(SharedStore(store.clone())), clock());

        manager.track_interaction(Some("happy"));
        manager.complete_task();
        let goal = manager.add_goal("Read 12 books", None);

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.history.interactions, 1);
        assert_eq!(saved.history.average_mood, "happy");
        assert_eq!(saved.history.completed_tasks, 1);
        assert_eq!(saved.goals, vec![goal]);
    }

    #[test]
    fn test_track_interaction_keeps_mood_when_none() {
        let manager = ProfileManager::load(Box::new(MemoryProfileStore::default()), clock());
        manager.track_interaction(Some("calm"));
        manager.track_interaction(None);
        manager.track_interaction(Some("  "));

        let profile = manager.snapshot();
        assert_eq!(profile.history.interactions, 3);
        assert_eq!(profile.history.average_mood, "calm");
    }

    #[test]
    fn test_goal_progress_clamped_and_unknown_id() {
        let manager = ProfileManager::load(Box::new(MemoryProfileStore::default()), clock());
        let goal = manager.add_goal("Run 5k", NaiveDate::from_ymd_opt(2024, 6, 1));

        let updated = manager.update_goal_progress(&goal.id, 150).unwrap();
        assert_eq!(updated.progress, 100);
        assert!(updated.is_complete());
        assert!(manager.update_goal_progress("nope", 10).is_none());
    }

    #[test]
    fn test_save_failure_degrades_to_memory() {
        let store = Arc::new(BrokenStore::default());
        let manager = ProfileManager::load(Box::new(SharedStore(store.clone())), clock());
        assert!(!manager.is_degraded());

        manager.track_interaction(Some("ok"));
        manager.track_interaction(Some("fine"));

        assert_eq!(manager.snapshot().history.interactions, 2);
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
        assert!(manager.is_degraded());
    }

    #[test]
    fn test_unreadable_profile_is_never_written() {
        let store = Arc::new(BrokenStore {
            unreadable: true,
            ..BrokenStore::default()
        });
        let manager = ProfileManager::load(Box::new(SharedStore(store.clone())), clock());
        assert!(manager.is_degraded());

        manager.track_interaction(Some("ok"));
        manager.complete_task();

        assert_eq!(manager.snapshot().history.interactions, 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
        assert!(manager.is_degraded());
    }

    #[test]
    fn test_corrupt_json_profile_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let corrupt = r#"{"name":"Ada","goals":[{"id":"g1","title":"Run","created_at":"not a date"}]}"#;
        std::fs::write(&path, corrupt).unwrap();

        let manager = ProfileManager::load(Box::new(JsonFileProfileStore::new(path.clone())), clock());
        manager.track_interaction(Some("calm"));

        assert!(manager.is_degraded());
        assert_eq!(manager.snapshot().history.interactions, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), corrupt);
    }

    /// Lets a test keep a handle on the store it hands to the manager
    struct SharedStore<S>(Arc<S>);

    impl<S: ProfileStore> ProfileStore for SharedStore<S> {
        fn load(&self) -> Result<Option<UserProfile>, StoreError> {
            self.0.load()
        }

        fn save(&self, profile: &UserProfile) -> Result<(), StoreError> {
            self.0.save(profile)
        }
    }
}
