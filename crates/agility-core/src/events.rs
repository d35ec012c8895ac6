use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::PerformanceMetrics;
use crate::session::{DrillExecution, Phase, SessionStatus};

/// Every state change in a session produces an Event.
/// Callers render them, log them, or forward them to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        program_id: String,
        player_id: String,
        estimated_secs: u64,
        at: DateTime<Utc>,
    },
    /// One second of the warm-up countdown.
    Countdown {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    DrillStarted {
        drill_index: usize,
        drill_id: String,
        at: DateTime<Utc>,
    },
    DrillCompleted {
        drill_index: usize,
        drill_id: String,
        at: DateTime<Utc>,
    },
    AttemptRecorded {
        attempt: DrillExecution,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u64,
        attempt_secs: f64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u64,
        attempt_secs: f64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        metrics: PerformanceMetrics,
        at: DateTime<Utc>,
    },
    SessionAbandoned {
        session_id: Uuid,
        phase: Phase,
        attempts_recorded: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        status: Option<SessionStatus>,
        paused: bool,
        drill_index: Option<usize>,
        drill_id: Option<String>,
        current_set: Option<u32>,
        current_rep: Option<u32>,
        elapsed_secs: u64,
        attempt_secs: f64,
        phase_remaining_secs: Option<u64>,
        progress_pct: f64,
        attempts_recorded: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. } | Event::SessionAbandoned { .. }
        )
    }
}
