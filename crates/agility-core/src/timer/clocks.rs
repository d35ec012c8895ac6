use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ticker::Ticker;

/// Resolution of the session-elapsed clock.
pub const ELAPSED_PERIOD: Duration = Duration::from_secs(1);

/// Resolution of the per-attempt clock.
pub const ATTEMPT_PERIOD: Duration = Duration::from_millis(100);

/// The two session clocks plus their shared pause flag.
///
/// Pausing freezes both clocks without stopping them; `resume` continues
/// from the frozen values. Stopping (`cancel`) is separate and final for
/// the elapsed clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClocks {
    elapsed: Ticker,
    attempt: Ticker,
    paused: bool,
}

impl SessionClocks {
    pub fn new() -> Self {
        Self {
            elapsed: Ticker::new(ELAPSED_PERIOD),
            attempt: Ticker::new(ATTEMPT_PERIOD),
            paused: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Whole seconds since the session started, excluding paused time.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.ticks()
    }

    /// Tenths of a second spent on the current attempt.
    pub fn attempt_tenths(&self) -> u64 {
        self.attempt.ticks()
    }

    /// Current attempt time in seconds, at 0.1 s granularity.
    pub fn attempt_secs(&self) -> f64 {
        self.attempt.ticks() as f64 / 10.0
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.elapsed.is_running()
    }

    pub fn attempt_running(&self) -> bool {
        self.attempt.is_running()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_elapsed(&mut self) {
        self.elapsed.start();
    }

    pub fn start_attempt(&mut self) {
        self.attempt.reset();
        self.attempt.start();
    }

    pub fn stop_attempt(&mut self) {
        self.attempt.stop();
        self.attempt.reset();
    }

    pub fn reset_attempt(&mut self) {
        self.attempt.reset();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Stop both clocks for good.
    pub fn cancel(&mut self) {
        self.elapsed.stop();
        self.attempt.stop();
        self.paused = false;
    }

    /// One elapsed-clock period. Returns whether the clock moved.
    pub fn tick_elapsed(&mut self) -> bool {
        !self.paused && self.elapsed.advance()
    }

    /// One attempt-clock period. Returns whether the clock moved.
    pub fn tick_attempt(&mut self) -> bool {
        !self.paused && self.attempt.advance()
    }
}

impl Default for SessionClocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_freezes_both_clocks() {
        let mut clocks = SessionClocks::new();
        clocks.start_elapsed();
        clocks.start_attempt();
        clocks.tick_elapsed();
        for _ in 0..7 {
            clocks.tick_attempt();
        }

        clocks.pause();
        assert!(!clocks.tick_elapsed());
        assert!(!clocks.tick_attempt());
        assert_eq!(clocks.elapsed_secs(), 1);
        assert_eq!(clocks.attempt_tenths(), 7);

        clocks.resume();
        assert!(clocks.tick_elapsed());
        assert!(clocks.tick_attempt());
        assert_eq!(clocks.elapsed_secs(), 2);
        assert_eq!(clocks.attempt_tenths(), 8);
    }

    #[test]
    fn attempt_secs_uses_tenths() {
        let mut clocks = SessionClocks::new();
        clocks.start_attempt();
        for _ in 0..34 {
            clocks.tick_attempt();
        }
        assert!((clocks.attempt_secs() - 3.4).abs() < f64::EPSILON);
        clocks.reset_attempt();
        assert_eq!(clocks.attempt_tenths(), 0);
        assert!(clocks.attempt_running());
    }

    #[test]
    fn cancel_stops_everything() {
        let mut clocks = SessionClocks::new();
        clocks.start_elapsed();
        clocks.start_attempt();
        clocks.cancel();
        assert!(!clocks.tick_elapsed());
        assert!(!clocks.tick_attempt());
        assert!(!clocks.is_running());
    }
}
