//! Expected session length.
//!
//! The session controller uses the same numbers to decide when cool-down
//! ends, so any change here shifts live sessions as well as displayed
//! estimates.

use serde::{Deserialize, Serialize};

use super::{AgilityProgram, Drill};

/// Assumed seconds per rep when a drill has neither `duration` nor `target_time`.
pub const DEFAULT_REP_SECS: u32 = 15;

/// Assumed rest between consecutive sets of one drill.
pub const DEFAULT_BETWEEN_SETS_REST_SECS: u32 = 60;

/// Fallback constants for [`estimate_duration_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateDefaults {
    #[serde(default = "default_rep_secs")]
    pub default_rep_secs: u32,
    #[serde(default = "default_between_sets_rest_secs")]
    pub between_sets_rest_secs: u32,
}

fn default_rep_secs() -> u32 {
    DEFAULT_REP_SECS
}
fn default_between_sets_rest_secs() -> u32 {
    DEFAULT_BETWEEN_SETS_REST_SECS
}

impl Default for EstimateDefaults {
    fn default() -> Self {
        Self {
            default_rep_secs: DEFAULT_REP_SECS,
            between_sets_rest_secs: DEFAULT_BETWEEN_SETS_REST_SECS,
        }
    }
}

/// Per-drill breakdown of the estimate, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillEstimate {
    pub drill_id: String,
    pub per_rep_secs: u64,
    pub total_reps: u64,
    pub work_secs: u64,
    pub rest_secs: u64,
    pub between_sets_secs: u64,
}

impl DrillEstimate {
    pub fn total_secs(&self) -> u64 {
        self.work_secs + self.rest_secs + self.between_sets_secs
    }
}

pub fn estimate_drill(drill: &Drill, defaults: &EstimateDefaults) -> DrillEstimate {
    let per_rep_secs = u64::from(
        drill
            .duration
            .or(drill.target_time)
            .unwrap_or(defaults.default_rep_secs),
    );
    let total_reps = u64::from(drill.reps) * u64::from(drill.set_count());
    let rest_secs = u64::from(drill.rest_between_reps) * total_reps.saturating_sub(1);
    let between_sets_secs = match drill.sets {
        Some(sets) => u64::from(sets.saturating_sub(1)) * u64::from(defaults.between_sets_rest_secs),
        None => 0,
    };
    DrillEstimate {
        drill_id: drill.id.clone(),
        per_rep_secs,
        total_reps,
        work_secs: per_rep_secs * total_reps,
        rest_secs,
        between_sets_secs,
    }
}

/// Seconds spent in the drills phase according to the estimate.
fn estimate_drills_secs(program: &AgilityProgram, defaults: &EstimateDefaults) -> u64 {
    program
        .drills
        .iter()
        .map(|d| estimate_drill(d, defaults).total_secs())
        .sum()
}

/// Total expected session length in seconds using the standard constants.
pub fn estimate_duration(program: &AgilityProgram) -> u64 {
    estimate_duration_with(program, &EstimateDefaults::default())
}

/// Total expected session length in seconds with explicit fallback constants.
pub fn estimate_duration_with(program: &AgilityProgram, defaults: &EstimateDefaults) -> u64 {
    u64::from(program.warmup_duration)
        + u64::from(program.cooldown_duration)
        + estimate_drills_secs(program, defaults)
}
