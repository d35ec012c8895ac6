//! Outbound seams of the session engine.
//!
//! The controller announces transitions through a [`Notifier`] and exposes
//! read-only [`RenderState`] for a [`PatternRenderer`]. Neither can affect
//! engine state: notifier errors are logged and dropped.

use std::error::Error;

use crate::program::Drill;

pub type NotifyResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Fire-and-forget audio/haptic cues.
///
/// Every method defaults to a no-op so implementations only override the
/// cues they support.
pub trait Notifier: Send {
    /// A timed phase (the drills phase) is starting.
    fn play_start(&mut self) -> NotifyResult {
        Ok(())
    }

    /// One second of the warm-up countdown, `remaining_secs` left.
    fn play_countdown(&mut self, _remaining_secs: u64) -> NotifyResult {
        Ok(())
    }

    /// A phase has been completed.
    fn play_complete(&mut self) -> NotifyResult {
        Ok(())
    }
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

/// Emits cues as tracing events. Useful for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn play_start(&mut self) -> NotifyResult {
        tracing::info!(cue = "start", "notifier cue");
        Ok(())
    }

    fn play_countdown(&mut self, remaining_secs: u64) -> NotifyResult {
        tracing::info!(cue = "countdown", remaining_secs, "notifier cue");
        Ok(())
    }

    fn play_complete(&mut self) -> NotifyResult {
        tracing::info!(cue = "complete", "notifier cue");
        Ok(())
    }
}

/// What a renderer may know about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderState {
    /// `running && !paused`.
    pub animate: bool,
    pub current_set: u32,
    pub current_rep: u32,
}

/// Draws a drill's pattern for the current attempt.
pub trait PatternRenderer {
    fn render(&mut self, drill: &Drill, state: RenderState);
}
