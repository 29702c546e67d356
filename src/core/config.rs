//! # Configuration
//!
//! Environment-driven settings for the assistant core. A `.env` file is read
//! when present; real environment variables win over it.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::core::clock::local_offset;
use crate::features::conversation::OrchestratorSettings;
use crate::features::habits::StreakPolicy;
use crate::features::profile::ProfileBackend;
use crate::features::reminders::SchedulerSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub sweep_interval_secs: u64,
    pub delivery_timeout_secs: u64,
    pub dismiss_grace_secs: u64,
    pub default_snooze_minutes: u64,
    pub completion_timeout_secs: u64,
    pub history_capacity: usize,
    pub streak_policy: StreakPolicy,
    pub profile_backend: ProfileBackend,
    pub profile_path: String,
    /// Offset used to turn instants into calendar days and wall-clock times
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            sweep_interval_secs: 30,
            delivery_timeout_secs: 10,
            dismiss_grace_secs: 300,
            default_snooze_minutes: 5,
            completion_timeout_secs: 30,
            history_capacity: 10,
            streak_policy: StreakPolicy::ResetOnGap,
            profile_backend: ProfileBackend::Json,
            profile_path: "chronomate-profile.json".to_string(),
            utc_offset: local_offset(),
        }
    }
}

/// One year; longer grace or snooze periods are rejected
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an explicit key/value map
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let utc_offset = match lookup("UTC_OFFSET_MINUTES") {
            Some(raw) => {
                let minutes: i32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("UTC_OFFSET_MINUTES is not a number: {raw}"))?;
                FixedOffset::east_opt(minutes * 60)
                    .ok_or_else(|| anyhow::anyhow!("UTC_OFFSET_MINUTES out of range: {minutes}"))?
            }
            None => defaults.utc_offset,
        };

        let config = Config {
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            openai_api_key: lookup("OPENAI_API_KEY").unwrap_or(defaults.openai_api_key),
            openai_model: lookup("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            sweep_interval_secs: parse_var(&lookup, "SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs)?,
            delivery_timeout_secs: parse_var(
                &lookup,
                "DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout_secs,
            )?,
            dismiss_grace_secs: parse_var(&lookup, "DISMISS_GRACE_SECS", defaults.dismiss_grace_secs)?,
            default_snooze_minutes: parse_var(
                &lookup,
                "DEFAULT_SNOOZE_MINUTES",
                defaults.default_snooze_minutes,
            )?,
            completion_timeout_secs: parse_var(
                &lookup,
                "COMPLETION_TIMEOUT_SECS",
                defaults.completion_timeout_secs,
            )?,
            history_capacity: parse_var(&lookup, "HISTORY_CAPACITY", defaults.history_capacity)?,
            streak_policy: parse_var(&lookup, "STREAK_POLICY", defaults.streak_policy)?,
            profile_backend: parse_var(&lookup, "PROFILE_BACKEND", defaults.profile_backend)?,
            profile_path: lookup("PROFILE_PATH").unwrap_or(defaults.profile_path),
            utc_offset,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!("SWEEP_INTERVAL_SECS must be greater than zero"));
        }
        if self.history_capacity == 0 {
            return Err(anyhow::anyhow!("HISTORY_CAPACITY must be greater than zero"));
        }
        if self.dismiss_grace_secs > MAX_DURATION_SECS {
            return Err(anyhow::anyhow!("DISMISS_GRACE_SECS must be at most {}", MAX_DURATION_SECS));
        }
        if self.default_snooze_minutes > MAX_DURATION_SECS / 60 {
            return Err(anyhow::anyhow!(
                "DEFAULT_SNOOZE_MINUTES must be at most {}",
                MAX_DURATION_SECS / 60
            ));
        }
        Ok(())
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            delivery_timeout: Duration::from_secs(self.delivery_timeout_secs),
            terminal_grace: chrono::Duration::seconds(self.dismiss_grace_secs as i64),
            default_snooze: chrono::Duration::minutes(self.default_snooze_minutes as i64),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            history_capacity: self.history_capacity,
            completion_timeout: Duration::from_secs(self.completion_timeout_secs),
            utc_offset: self.utc_offset,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key} ({raw}): {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::from_map(&HashMap::new()).unwrap();
        assert_eq!(config.sweep_interval_secs, 30);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.default_snooze_minutes, 5);
        assert_eq!(config.streak_policy, StreakPolicy::ResetOnGap);
        assert_eq!(config.profile_backend, ProfileBackend::Json);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_map(&vars(&[
            ("SWEEP_INTERVAL_SECS", "5"),
            ("STREAK_POLICY", "legacy"),
            ("PROFILE_BACKEND", "sqlite"),
            ("UTC_OFFSET_MINUTES", "-300"),
            ("OPENAI_MODEL", "gpt-4o"),
        ]))
        .unwrap();

        assert_eq!(config.sweep_interval_secs, 5);
        assert_eq!(config.streak_policy, StreakPolicy::Legacy);
        assert_eq!(config.profile_backend, ProfileBackend::Sqlite);
        assert_eq!(config.utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(
            config.scheduler_settings().sweep_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        assert!(Config::from_map(&vars(&[("SWEEP_INTERVAL_SECS", "soon")])).is_err());
        assert!(Config::from_map(&vars(&[("SWEEP_INTERVAL_SECS", "0")])).is_err());
        assert!(Config::from_map(&vars(&[("STREAK_POLICY", "sometimes")])).is_err());
        assert!(Config::from_map(&vars(&[("UTC_OFFSET_MINUTES", "99999")])).is_err());
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        assert!(Config::from_map(&vars(&[("DISMISS_GRACE_SECS", "18446744073709551615")])).is_err());
        assert!(Config::from_map(&vars(&[("DEFAULT_SNOOZE_MINUTES", "999999999999")])).is_err());
        assert!(Config::from_map(&vars(&[("DEFAULT_SNOOZE_MINUTES", "60")])).is_ok());
    }
}
