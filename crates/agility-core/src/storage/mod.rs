mod config;
pub mod migrations;
mod session_store;

pub use config::{Config, EstimateConfig, NotificationsConfig, SessionConfig};
pub use session_store::{DrillBest, PlayerSummary, SessionSink, SessionStore, SessionSummary};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/agility[-dev]/` based on AGILITY_ENV.
///
/// Set AGILITY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("AGILITY_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("agility-dev")
    } else {
        base_dir.join("agility")
    };

    std::fs::create_dir_all(&dir).map_err(ConfigError::DataDir)?;
    Ok(dir)
}
