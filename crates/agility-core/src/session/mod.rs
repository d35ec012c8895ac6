//! Live session execution.
//!
//! [`SessionController`] is the synchronous state machine; [`SessionRunner`]
//! drives one on the tokio runtime in real time.

mod controller;
mod execution;
mod progression;
mod runner;

pub use controller::{Phase, SessionController, SessionSettings, DEFAULT_COUNTDOWN_SECS};
pub use execution::{AgilitySessionExecution, DrillExecution, SessionStatus};
pub use progression::{Advance, DrillProgress, DrillStatus, ProgressionTracker};
pub use runner::{SessionHandle, SessionRunner};
