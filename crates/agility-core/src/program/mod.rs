//! Workout program model and duration estimation.
//!
//! An [`AgilityProgram`] is an immutable description of a workout. Sessions
//! borrow nothing from the caller: the controller takes its own copy of the
//! program when constructed.

mod drill;
mod estimate;

pub use drill::{Difficulty, Drill, DrillCategory, DrillPattern};
pub use estimate::{
    estimate_drill, estimate_duration, estimate_duration_with, DrillEstimate, EstimateDefaults,
    DEFAULT_BETWEEN_SETS_REST_SECS, DEFAULT_REP_SECS,
};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgilityProgram {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub drills: Vec<Drill>,
    /// Warm-up duration in seconds.
    #[serde(default)]
    pub warmup_duration: u32,
    /// Cool-down duration in seconds.
    #[serde(default)]
    pub cooldown_duration: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl AgilityProgram {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            drills: Vec::new(),
            warmup_duration: 0,
            cooldown_duration: 0,
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_drill(mut self, drill: Drill) -> Self {
        self.drills.push(drill);
        self
    }

    pub fn with_warmup(mut self, secs: u32) -> Self {
        self.warmup_duration = secs;
        self
    }

    pub fn with_cooldown(mut self, secs: u32) -> Self {
        self.cooldown_duration = secs;
        self
    }

    /// Check that the program can be executed.
    ///
    /// # Errors
    /// Returns the first problem found: an empty drill list, or a drill
    /// with invalid reps/sets.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.drills.is_empty() {
            return Err(ValidationError::EmptyProgram {
                program_id: self.id.clone(),
            });
        }
        self.drills.iter().try_for_each(Drill::validate)
    }

    /// Equipment needed across all drills, deduplicated in first-seen order.
    pub fn required_equipment(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for item in self.drills.iter().flat_map(|d| d.equipment.iter()) {
            if !seen.iter().any(|s| s.eq_ignore_ascii_case(item)) {
                seen.push(item.clone());
            }
        }
        seen
    }

    /// Reps across every drill and set.
    pub fn total_reps(&self) -> u32 {
        self.drills.iter().map(Drill::total_reps).sum()
    }

    pub fn drill(&self, index: usize) -> Option<&Drill> {
        self.drills.get(index)
    }

    /// Load a program from a `.toml` or `.json` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            toml::from_str(&content).map_err(|e| {
                CoreError::Validation(ValidationError::InvalidValue {
                    field: path.display().to_string(),
                    message: e.to_string(),
                })
            })
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }
}
