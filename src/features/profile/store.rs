//! Profile persistence backends
//!
//! Only the load/save contract matters to the rest of the crate; the
//! backend is picked from `PROFILE_BACKEND`.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::model::UserProfile;

/// Key the profile is stored under
pub const PROFILE_KEY: &str = "chronomate-user-profile";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile data is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("profile database error: {0}")]
    Sqlite(#[from] sqlite::Error),
}

/// Load/save contract for the profile aggregate
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<UserProfile>, StoreError>;
    fn save(&self, profile: &UserProfile) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileBackend {
    Memory,
    Json,
    Sqlite,
}

impl std::fmt::Display for ProfileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileBackend::Memory => write!(f, "memory"),
            ProfileBackend::Json => write!(f, "json"),
            ProfileBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for ProfileBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(ProfileBackend::Memory),
            "json" | "file" => Ok(ProfileBackend::Json),
            "sqlite" => Ok(ProfileBackend::Sqlite),
            _ => Err(anyhow::anyhow!("Invalid profile backend: {}", s)),
        }
    }
}

/// Open the store for `backend`; `path` is ignored for the memory backend
pub fn open_store(
    backend: ProfileBackend,
    path: impl AsRef<Path>,
) -> Result<Box<dyn ProfileStore>, StoreError> {
    Ok(match backend {
        ProfileBackend::Memory => Box::new(MemoryProfileStore::default()),
        ProfileBackend::Json => Box::new(JsonFileProfileStore::new(path.as_ref())),
        ProfileBackend::Sqlite => Box::new(SqliteProfileStore::open(path)?),
    })
}

/// Keeps the last saved profile in memory
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    slot: Mutex<Option<UserProfile>>,
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, profile: &UserProfile) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(profile.clone());
        Ok(())
    }
}

/// Pretty-printed JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProfileStore for JsonFileProfileStore {
    fn load(&self) -> Result<Option<UserProfile>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(profile)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Saved profile to {}", self.path.display());
        Ok(())
    }
}

/// Single key/value table in a SQLite database
pub struct SqliteProfileStore {
    connection: Mutex<sqlite::Connection>,
}

impl SqliteProfileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let connection = sqlite::open(path)?;
        connection.execute(
            "CREATE TABLE IF NOT EXISTS profile_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl ProfileStore for SqliteProfileStore {
    fn load(&self) -> Result<Option<UserProfile>, StoreError> {
        let connection = self.connection.lock().unwrap_or_else(|e| e.into_inner());
        let mut statement = connection.prepare("SELECT value FROM profile_store WHERE key = ?")?;
        statement.bind((1, PROFILE_KEY))?;

        if let sqlite::State::Row = statement.next()? {
            let value = statement.read::<String, _>(0)?;
            return Ok(Some(serde_json::from_str(&value)?));
        }
        Ok(None)
    }

    fn save(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let value = serde_json::to_string(profile)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        let connection = self.connection.lock().unwrap_or_else(|e| e.into_inner());
        let mut statement = connection.prepare(
            "INSERT OR REPLACE INTO profile_store (key, value, updated_at) VALUES (?, ?, ?)",
        )?;
        statement.bind((1, PROFILE_KEY))?;
        statement.bind((2, value.as_str()))?;
        statement.bind((3, updated_at.as_str()))?;
        statement.next()?;
        Ok(())
    }
}
