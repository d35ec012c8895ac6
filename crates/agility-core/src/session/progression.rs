//! Nested drill → set → rep cursor.
//!
//! The tracker knows nothing about time. It records attempts and reports
//! how the cursor moved so the controller can react (reset the attempt
//! clock, announce a new drill, or leave the drills phase).

use serde::{Deserialize, Serialize};

use super::execution::DrillExecution;
use crate::error::SessionError;
use crate::program::AgilityProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillStatus {
    Pending,
    Active,
    Completed,
}

/// Per-drill progress state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillProgress {
    pub drill_id: String,
    pub status: DrillStatus,
    /// 1-based.
    pub current_set: u32,
    /// 1-based.
    pub current_rep: u32,
    pub attempts: Vec<DrillExecution>,
    reps: u32,
    sets: u32,
}

impl DrillProgress {
    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn sets(&self) -> u32 {
        self.sets
    }

    fn next_attempt_number(&self) -> u32 {
        (self.current_set - 1) * self.reps + self.current_rep
    }
}

/// How the cursor moved after an attempt was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Same drill and set, next rep.
    NextRep { rep: u32 },
    /// Same drill, first rep of the next set.
    NextSet { set: u32 },
    /// The drill at `completed` finished and `next` is now active.
    NextDrill { completed: usize, next: usize },
    /// The last drill finished.
    AllComplete { completed: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionTracker {
    drills: Vec<DrillProgress>,
    current: Option<usize>,
}

impl ProgressionTracker {
    pub fn new(program: &AgilityProgram) -> Self {
        let drills = program
            .drills
            .iter()
            .map(|d| DrillProgress {
                drill_id: d.id.clone(),
                status: DrillStatus::Pending,
                current_set: 1,
                current_rep: 1,
                attempts: Vec::new(),
                reps: d.reps.max(1),
                sets: d.set_count().max(1),
            })
            .collect();
        Self {
            drills,
            current: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn drills(&self) -> &[DrillProgress] {
        &self.drills
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&DrillProgress> {
        self.current.and_then(|i| self.drills.get(i))
    }

    pub fn current_set(&self) -> Option<u32> {
        self.current().map(|d| d.current_set)
    }

    pub fn current_rep(&self) -> Option<u32> {
        self.current().map(|d| d.current_rep)
    }

    pub fn has_active(&self) -> bool {
        self.current()
            .is_some_and(|d| d.status == DrillStatus::Active)
    }

    pub fn completed_count(&self) -> usize {
        self.drills
            .iter()
            .filter(|d| d.status == DrillStatus::Completed)
            .count()
    }

    pub fn all_completed(&self) -> bool {
        !self.drills.is_empty() && self.completed_count() == self.drills.len()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Mark the first drill active. Returns `false` if there is nothing to
    /// activate or a drill was already activated.
    pub fn activate_first(&mut self) -> bool {
        if self.current.is_some() {
            return false;
        }
        match self.drills.first_mut() {
            Some(first) => {
                first.status = DrillStatus::Active;
                self.current = Some(0);
                true
            }
            None => false,
        }
    }

    /// Record an attempt for the active drill and advance the cursor.
    ///
    /// Rep exhaustion is checked before set exhaustion, which is checked
    /// before drill exhaustion.
    ///
    /// # Errors
    /// Returns `SessionError::NoActiveDrill` if no drill is active. The
    /// tracker is left unchanged.
    pub fn record(
        &mut self,
        completion_time: f64,
        errors: u32,
        notes: Option<String>,
    ) -> Result<(DrillExecution, Advance), SessionError> {
        let index = self.current.ok_or(SessionError::NoActiveDrill)?;
        let drill = self
            .drills
            .get_mut(index)
            .filter(|d| d.status == DrillStatus::Active)
            .ok_or(SessionError::NoActiveDrill)?;

        let attempt = DrillExecution {
            drill_id: drill.drill_id.clone(),
            attempt_number: drill.next_attempt_number(),
            completion_time,
            errors,
            notes,
        };
        drill.attempts.push(attempt.clone());

        if drill.current_rep < drill.reps {
            drill.current_rep += 1;
            return Ok((attempt, Advance::NextRep { rep: drill.current_rep }));
        }
        if drill.current_set < drill.sets {
            drill.current_set += 1;
            drill.current_rep = 1;
            return Ok((attempt, Advance::NextSet { set: drill.current_set }));
        }

        drill.status = DrillStatus::Completed;
        let next = index + 1;
        match self.drills.get_mut(next) {
            Some(next_drill) => {
                next_drill.status = DrillStatus::Active;
                next_drill.current_set = 1;
                next_drill.current_rep = 1;
                self.current = Some(next);
                Ok((attempt, Advance::NextDrill { completed: index, next }))
            }
            None => {
                self.current = None;
                Ok((attempt, Advance::AllComplete { completed: index }))
            }
        }
    }
}
