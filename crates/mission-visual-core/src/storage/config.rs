//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timezone used to decide when a day is over
//! - Notification buffer size and display window
//! - Lifecycle policy switches
//! - Per-user overrides (currently the timezone)
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::challenge::LifecyclePolicy;
use crate::error::{ConfigError, ValidationError};
use crate::notify::{NotificationCenter, DEFAULT_CAPACITY, DEFAULT_DISPLAY_SECS};
use crate::timezone::Timezone;

/// Upper bound for the notification display window (one day).
const MAX_DISPLAY_SECS: u64 = 86_400;

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seconds a notification stays visible
    #[serde(default = "default_display_secs")]
    pub display_secs: u64,
}

/// Challenge lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Fail a challenge when one of its make-up days is missed
    #[serde(default = "default_true")]
    pub fail_on_missed_makeup: bool,
}

/// Settings that override the global ones for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// IANA timezone name
    pub timezone: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone name
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    /// Keyed by user id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, UserConfig>,
}

fn default_timezone() -> String {
    "UTC".into()
}
fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_display_secs() -> u64 {
    DEFAULT_DISPLAY_SECS
}
fn default_true() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            display_secs: default_display_secs(),
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            fail_on_missed_makeup: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            notifications: NotificationsConfig::default(),
            challenge: ChallengeConfig::default(),
            users: BTreeMap::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("only leaf values can be set".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.timezone()?;
        if self.notifications.capacity == 0 {
            return Err(ValidationError::InvalidValue {
                field: "notifications.capacity".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.notifications.display_secs > MAX_DISPLAY_SECS {
            return Err(ValidationError::InvalidValue {
                field: "notifications.display_secs".into(),
                message: format!("must not exceed {MAX_DISPLAY_SECS}"),
            });
        }
        for user in self.users.values() {
            user.timezone.parse::<Timezone>()?;
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Timezone, ValidationError> {
        self.timezone.parse()
    }

    /// Timezone of `user_id`, falling back to the global one.
    pub fn timezone_for(&self, user_id: &str) -> Result<Timezone, ValidationError> {
        match self.users.get(user_id) {
            Some(user) => user.timezone.parse(),
            None => self.timezone(),
        }
    }

    /// Record a timezone for one user. Call `save` to persist it.
    pub fn set_user_timezone(&mut self, user_id: &str, timezone: Timezone) {
        self.users.insert(
            user_id.to_string(),
            UserConfig {
                timezone: timezone.name().to_string(),
            },
        );
    }

    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            fail_on_missed_makeup: self.challenge.fail_on_missed_makeup,
        }
    }

    pub fn notification_center(&self) -> NotificationCenter {
        let secs = self.notifications.display_secs.min(MAX_DISPLAY_SECS) as i64;
        NotificationCenter::new(self.notifications.capacity, Duration::seconds(secs))
    }
}
