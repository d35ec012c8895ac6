//! Performance metrics over recorded attempts.
//!
//! Aggregation is a pure reduction: the same attempt list always yields the
//! same metrics, whether computed live or replayed from storage.

use serde::{Deserialize, Serialize};

use crate::session::DrillExecution;

/// Summary statistics for a whole session.
///
/// `success_rate` is `(count - total_errors) / count * 100`. Errors are
/// subtracted from the attempt count, so the rate goes negative once there
/// are more errors than attempts. It is not clamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub attempt_count: usize,
    pub total_time: f64,
    pub avg_completion_time: f64,
    pub best_time: f64,
    pub total_errors: u32,
    pub success_rate: f64,
    #[serde(default)]
    pub per_drill: Vec<DrillMetrics>,
}

/// The same statistics restricted to one drill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillMetrics {
    pub drill_id: String,
    pub attempt_count: usize,
    pub total_time: f64,
    pub avg_completion_time: f64,
    pub best_time: f64,
    pub total_errors: u32,
    pub success_rate: f64,
}

#[derive(Default)]
struct Totals {
    count: usize,
    total_time: f64,
    best_time: Option<f64>,
    errors: u32,
}

impl Totals {
    fn add(&mut self, attempt: &DrillExecution) {
        self.count += 1;
        self.total_time += attempt.completion_time;
        self.errors = self.errors.saturating_add(attempt.errors);
        self.best_time = Some(match self.best_time {
            Some(best) => best.min(attempt.completion_time),
            None => attempt.completion_time,
        });
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_time / self.count as f64
        }
    }

    fn success_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let count = self.count as f64;
        (count - f64::from(self.errors)) / count * 100.0
    }
}

impl PerformanceMetrics {
    pub fn aggregate(attempts: &[DrillExecution]) -> Self {
        let mut overall = Totals::default();
        let mut drills: Vec<(String, Totals)> = Vec::new();

        for attempt in attempts {
            overall.add(attempt);
            match drills.iter_mut().find(|(id, _)| *id == attempt.drill_id) {
                Some((_, totals)) => totals.add(attempt),
                None => {
                    let mut totals = Totals::default();
                    totals.add(attempt);
                    drills.push((attempt.drill_id.clone(), totals));
                }
            }
        }

        let per_drill = drills
            .into_iter()
            .map(|(drill_id, t)| DrillMetrics {
                drill_id,
                attempt_count: t.count,
                total_time: t.total_time,
                avg_completion_time: t.avg(),
                best_time: t.best_time.unwrap_or(0.0),
                total_errors: t.errors,
                success_rate: t.success_rate(),
            })
            .collect();

        Self {
            attempt_count: overall.count,
            total_time: overall.total_time,
            avg_completion_time: overall.avg(),
            best_time: overall.best_time.unwrap_or(0.0),
            total_errors: overall.errors,
            success_rate: overall.success_rate(),
            per_drill,
        }
    }
}
