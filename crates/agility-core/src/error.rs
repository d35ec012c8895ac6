//! Core error types for agility-core.
//!
//! Every fallible operation in the library reports one of the enums below.
//! `CoreError` is the umbrella type used at the storage and CLI seams; the
//! session engine itself only ever returns `SessionError`.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::{Phase, SessionStatus};

/// Core error type for agility-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session runner errors
    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Program and input validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A program must contain at least one drill before a session can start
    #[error("Program '{program_id}' has no drills")]
    EmptyProgram { program_id: String },

    /// Drill reps must be at least 1
    #[error("Drill '{drill_id}' has invalid reps ({reps}); at least 1 is required")]
    InvalidReps { drill_id: String, reps: u32 },

    /// Drill sets, when present, must be at least 1
    #[error("Drill '{drill_id}' has invalid sets ({sets}); at least 1 is required")]
    InvalidSets { drill_id: String, sets: u32 },

    /// Completion time must be a finite, non-negative number of seconds
    #[error("Invalid completion time: {0}")]
    InvalidCompletionTime(f64),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors reported by the session controller for calls it cannot accept.
///
/// A rejected call never mutates controller state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The program or a command argument failed validation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// `start()` was called twice
    #[error("Session has already been started")]
    AlreadyStarted,

    /// A command that needs a running session was called before `start()`
    #[error("Session has not been started")]
    NotStarted,

    /// The session already reached a terminal status
    #[error("Session is {0}")]
    Finished(SessionStatus),

    /// `record_attempt` outside the drills phase
    #[error("Attempts can only be recorded during the drills phase (current phase: {0})")]
    NotInDrills(Phase),

    /// `record_attempt` while no drill is active
    #[error("No drill is currently active")]
    NoActiveDrill,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Only finished sessions can be stored
    #[error("Session '{0}' is still in progress")]
    NotFinished(String),

    /// Stored record payload could not be decoded
    #[error("Corrupt session record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors from the async session runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The runner task has already exited
    #[error("Session runner has stopped")]
    Stopped,

    /// The runner task panicked or was aborted
    #[error("Session runner task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The controller rejected the command
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::InvalidValue {
            key: "<file>".into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
