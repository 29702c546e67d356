//! # Profile Feature
//!
//! Per-user profile aggregate (preferences, interaction history, habits,
//! goals) and its persistence.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod manager;
pub mod model;
pub mod store;

pub use manager::ProfileManager;
pub use model::{
    CommunicationStyle, Goal, InteractionHistory, Preferences, ReminderFrequency, UserProfile,
};
pub use store::{
    open_store, JsonFileProfileStore, MemoryProfileStore, ProfileBackend, ProfileStore,
    SqliteProfileStore, StoreError,
};
