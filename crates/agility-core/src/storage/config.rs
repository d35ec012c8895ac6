//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Fallback constants for duration estimates
//! - Session cue settings and the default player
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/agility/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::notify::{LogNotifier, NoopNotifier, Notifier};
use crate::program::{EstimateDefaults, DEFAULT_BETWEEN_SETS_REST_SECS, DEFAULT_REP_SECS};
use crate::session::{SessionSettings, DEFAULT_COUNTDOWN_SECS};

/// Estimate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateConfig {
    #[serde(default = "default_rep_secs")]
    pub default_rep_secs: u32,
    #[serde(default = "default_between_sets_rest_secs")]
    pub between_sets_rest_secs: u32,
}

/// Live session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,
    /// Player id used when `run` is given no `--player`.
    #[serde(default = "default_player")]
    pub default_player: String,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/agility/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub estimate: EstimateConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_rep_secs() -> u32 {
    DEFAULT_REP_SECS
}
fn default_between_sets_rest_secs() -> u32 {
    DEFAULT_BETWEEN_SETS_REST_SECS
}
fn default_countdown_secs() -> u64 {
    DEFAULT_COUNTDOWN_SECS
}
fn default_player() -> String {
    "player".into()
}
fn default_true() -> bool {
    true
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            default_rep_secs: default_rep_secs(),
            between_sets_rest_secs: default_between_sets_rest_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_secs: default_countdown_secs(),
            default_player: default_player(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
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
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if part.is_empty() {
                break;
            }
            if parts.peek().is_some() {
                current = current
                    .get_mut(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                continue;
            }

            let obj = current
                .as_object_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let existing = obj
                .get(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                serde_json::Value::Object(_) => {
                    return Err(ConfigError::UnknownKey(key.to_string()));
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Path of the config file in the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// A missing file is created with defaults.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Persist to the default location.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    /// Returns an error if the config cannot be serialized or written to disk.
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

    /// Set a config value by dot-separated key. Does not persist.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flattened `key = value` pairs for every leaf setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.estimate.default_rep_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "estimate.default_rep_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.session.default_player.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "session.default_player".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn estimate_defaults(&self) -> EstimateDefaults {
        EstimateDefaults {
            default_rep_secs: self.estimate.default_rep_secs,
            between_sets_rest_secs: self.estimate.between_sets_rest_secs,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            estimate: self.estimate_defaults(),
            countdown_secs: self.session.countdown_secs,
        }
    }

    /// Cue sink selected by `notifications.enabled`.
    pub fn notifier(&self) -> Box<dyn Notifier> {
        if self.notifications.enabled {
            Box::new(LogNotifier)
        } else {
            Box::new(NoopNotifier)
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}
