use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::PerformanceMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_finished(self) -> bool {
        self != SessionStatus::InProgress
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one rep. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillExecution {
    pub drill_id: String,
    /// 1-based and unique within the drill across all of its sets.
    pub attempt_number: u32,
    /// Seconds.
    pub completion_time: f64,
    pub errors: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The record a session produces.
///
/// Created at `start()`, extended by every recorded attempt, and sealed when
/// the session completes. An abandoned record keeps its attempts but has no
/// end timestamp and no metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgilitySessionExecution {
    pub id: Uuid,
    pub player_id: String,
    pub program_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    #[serde(default)]
    pub attempts: Vec<DrillExecution>,
    #[serde(default)]
    pub metrics: Option<PerformanceMetrics>,
}

impl AgilitySessionExecution {
    pub(crate) fn begin(player_id: String, program_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            program_id,
            started_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::InProgress,
            attempts: Vec::new(),
            metrics: None,
        }
    }

    pub(crate) fn seal(&mut self) {
        self.ended_at = Some(Utc::now());
        self.metrics = Some(PerformanceMetrics::aggregate(&self.attempts));
        self.status = SessionStatus::Completed;
    }

    pub(crate) fn abandon(&mut self) {
        self.status = SessionStatus::Abandoned;
    }

    pub fn attempts_for<'a>(&'a self, drill_id: &'a str) -> impl Iterator<Item = &'a DrillExecution> + 'a {
        self.attempts.iter().filter(move |a| a.drill_id == drill_id)
    }

    /// Wall-clock length of a completed session in seconds.
    pub fn wall_clock_secs(&self) -> Option<i64> {
        self.ended_at.map(|end| (end - self.started_at).num_seconds())
    }
}
