//! # Agility Core Library
//!
//! This library provides the session engine for agility training programs.
//! A program is an ordered list of drills bracketed by warm-up and cool-down;
//! a session walks a player through it while the coach records attempts.
//!
//! ## Architecture
//!
//! - **Session Controller**: A tick-driven state machine that requires the
//!   caller to invoke `tick_elapsed()` every second and `tick_attempt()` every
//!   100 ms
//! - **Session Runner**: Drives a controller on the tokio runtime and
//!   broadcasts its events
//! - **Storage**: SQLite-based storage of finished sessions and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`SessionController`]: Core session state machine
//! - [`SessionRunner`]: Real-time driver for a controller
//! - [`estimate_duration`]: Expected session length for a program
//! - [`SessionStore`]: Finished session persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod metrics;
pub mod notify;
pub mod program;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, RunnerError, SessionError, StorageError, ValidationError};
pub use events::Event;
pub use metrics::{DrillMetrics, PerformanceMetrics};
pub use notify::{LogNotifier, NoopNotifier, Notifier, PatternRenderer, RenderState};
pub use program::{
    estimate_duration, estimate_duration_with, AgilityProgram, Difficulty, Drill, DrillCategory,
    EstimateDefaults,
};
pub use session::{
    AgilitySessionExecution, DrillExecution, Phase, SessionController, SessionHandle,
    SessionRunner, SessionSettings, SessionStatus,
};
pub use storage::{Config, SessionSink, SessionStore};
