use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A cancellable periodic counter.
///
/// Ticker does not own a thread or read the clock. Whoever drives it calls
/// [`Ticker::advance`] once per `period`; drift between calls is tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    period_ms: u64,
    ticks: u64,
    running: bool,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period_ms: period.as_millis() as u64,
            ticks: 0,
            running: false,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop counting. The current value is kept.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }

    /// Count one period. Returns `false` if the ticker is stopped.
    pub fn advance(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.ticks = self.ticks.saturating_add(1);
        true
    }

    /// Counted time as a `Duration`.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.period_ms.saturating_mul(self.ticks))
    }
}
