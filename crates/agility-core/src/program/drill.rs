use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillCategory {
    Footwork,
    Acceleration,
    ChangeOfDirection,
    Reaction,
    Ladder,
    Cone,
    Plyometric,
    Balance,
    SportSpecific,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

/// Layout data for the pattern renderer.
///
/// Opaque to the engine: it is forwarded as-is to whatever renders the
/// current drill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrillPattern {
    /// Cone/marker positions in field units.
    #[serde(default)]
    pub markers: Vec<(f32, f32)>,
    /// Movement path as indices into `markers`.
    #[serde(default)]
    pub path: Vec<usize>,
}

/// One exercise unit within a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drill {
    pub id: String,
    pub name: String,
    pub category: DrillCategory,
    #[serde(default)]
    pub equipment: Vec<String>,
    /// Fixed work duration per rep in seconds, if the drill is time-boxed.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Target completion time per rep in seconds.
    #[serde(default)]
    pub target_time: Option<u32>,
    #[serde(default)]
    pub rest_between_reps: u32,
    pub reps: u32,
    /// Number of sets; absent means a single set.
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub coaching_cues: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub pattern: Option<DrillPattern>,
}

impl Drill {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: DrillCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            equipment: Vec::new(),
            duration: None,
            target_time: None,
            rest_between_reps: 0,
            reps: 1,
            sets: None,
            instructions: Vec::new(),
            coaching_cues: Vec::new(),
            difficulty: Difficulty::default(),
            pattern: None,
        }
    }

    pub fn with_reps(mut self, reps: u32) -> Self {
        self.reps = reps;
        self
    }

    pub fn with_sets(mut self, sets: u32) -> Self {
        self.sets = Some(sets);
        self
    }

    pub fn with_target_time(mut self, secs: u32) -> Self {
        self.target_time = Some(secs);
        self
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn with_rest(mut self, secs: u32) -> Self {
        self.rest_between_reps = secs;
        self
    }

    pub fn with_equipment(mut self, items: &[&str]) -> Self {
        self.equipment = items.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Number of sets, defaulting to 1 when unset.
    pub fn set_count(&self) -> u32 {
        self.sets.unwrap_or(1)
    }

    /// Total reps across all sets.
    pub fn total_reps(&self) -> u32 {
        self.reps.saturating_mul(self.set_count())
    }

    /// # Errors
    /// Returns an error if `reps` is zero or `sets` is present and zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reps < 1 {
            return Err(ValidationError::InvalidReps {
                drill_id: self.id.clone(),
                reps: self.reps,
            });
        }
        if let Some(sets) = self.sets {
            if sets < 1 {
                return Err(ValidationError::InvalidSets {
                    drill_id: self.id.clone(),
                    sets,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_count_defaults_to_one() {
        let drill = Drill::new("d1", "Ladder In-Out", DrillCategory::Ladder).with_reps(4);
        assert_eq!(drill.set_count(), 1);
        assert_eq!(drill.total_reps(), 4);
        assert_eq!(drill.with_sets(3).total_reps(), 12);
    }

    #[test]
    fn zero_reps_is_rejected() {
        let drill = Drill::new("d1", "T-Drill", DrillCategory::Cone).with_reps(0);
        assert_eq!(
            drill.validate(),
            Err(ValidationError::InvalidReps {
                drill_id: "d1".into(),
                reps: 0
            })
        );
    }

    #[test]
    fn zero_sets_is_rejected() {
        let drill = Drill::new("d1", "T-Drill", DrillCategory::Cone).with_sets(0);
        assert!(matches!(
            drill.validate(),
            Err(ValidationError::InvalidSets { sets: 0, .. })
        ));
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let json = r#"{
            "id": "5-10-5",
            "name": "Pro Agility",
            "category": "change_of_direction",
            "targetTime": 5,
            "restBetweenReps": 45,
            "reps": 3
        }"#;
        let drill: Drill = serde_json::from_str(json).unwrap();
        assert_eq!(drill.target_time, Some(5));
        assert_eq!(drill.rest_between_reps, 45);
        assert_eq!(drill.sets, None);
        assert_eq!(drill.difficulty, Difficulty::Beginner);
        assert!(drill.equipment.is_empty());
    }
}
