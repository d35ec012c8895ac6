//! Session controller.
//!
//! The controller is a tick-driven state machine. It does not use internal
//! threads or read the wall clock for timing - the caller is responsible for
//! calling `tick_elapsed()` once per second and `tick_attempt()` every
//! 100 ms (see [`SessionRunner`](super::SessionRunner) for a driver).
//!
//! ## Phases
//!
//! ```text
//! Warmup -> Drills -> Cooldown -> Completed
//! ```
//!
//! `cancel()` leaves the phase where it is and marks the record abandoned.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = SessionController::new(program, "player-1");
//! session.start()?;
//! // Every second:
//! session.tick_elapsed();
//! // Every 100 ms:
//! session.tick_attempt();
//! // When the athlete finishes a rep:
//! session.record_attempt(4.2, 0, None)?;
//! ```

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::execution::{AgilitySessionExecution, DrillExecution, SessionStatus};
use super::progression::{Advance, ProgressionTracker};
use crate::error::{SessionError, ValidationError};
use crate::events::Event;
use crate::notify::{NoopNotifier, Notifier, PatternRenderer, RenderState};
use crate::program::{estimate_duration_with, AgilityProgram, Drill, EstimateDefaults};
use crate::timer::SessionClocks;

/// Default length of the warm-up countdown in seconds.
pub const DEFAULT_COUNTDOWN_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Warmup,
    Drills,
    Cooldown,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Warmup => "warmup",
            Phase::Drills => "drills",
            Phase::Cooldown => "cooldown",
            Phase::Completed => "completed",
        })
    }
}

/// Tunables that affect a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub estimate: EstimateDefaults,
    /// Warm-up seconds announced with a countdown cue.
    pub countdown_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            estimate: EstimateDefaults::default(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Cue {
    Start,
    Countdown(u64),
    Complete,
}

fn default_notifier() -> Box<dyn Notifier> {
    Box::new(NoopNotifier)
}

/// Runs one agility session from warm-up to completion.
///
/// All session state lives in this one value and serializes as a unit; the
/// notifier is not serialized and comes back as a no-op.
#[derive(Serialize, Deserialize)]
pub struct SessionController {
    program: AgilityProgram,
    player_id: String,
    settings: SessionSettings,
    phase: Phase,
    tracker: ProgressionTracker,
    clocks: SessionClocks,
    execution: Option<AgilitySessionExecution>,
    #[serde(skip, default = "default_notifier")]
    notifier: Box<dyn Notifier>,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("program_id", &self.program.id)
            .field("player_id", &self.player_id)
            .field("phase", &self.phase)
            .field("clocks", &self.clocks)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller in the `Warmup` phase. Nothing runs until `start()`.
    pub fn new(program: AgilityProgram, player_id: impl Into<String>) -> Self {
        let tracker = ProgressionTracker::new(&program);
        Self {
            program,
            player_id: player_id.into(),
            settings: SessionSettings::default(),
            phase: Phase::Warmup,
            tracker,
            clocks: SessionClocks::new(),
            execution: None,
            notifier: default_notifier(),
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn set_notifier(&mut self, notifier: Box<dyn Notifier>) {
        self.notifier = notifier;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn program(&self) -> &AgilityProgram {
        &self.program
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &ProgressionTracker {
        &self.tracker
    }

    /// `None` until `start()`.
    pub fn status(&self) -> Option<SessionStatus> {
        self.execution.as_ref().map(|e| e.status)
    }

    pub fn execution(&self) -> Option<&AgilitySessionExecution> {
        self.execution.as_ref()
    }

    pub fn into_execution(self) -> Option<AgilitySessionExecution> {
        self.execution
    }

    /// The sealed record, once the session has completed naturally.
    pub fn completed_execution(&self) -> Option<&AgilitySessionExecution> {
        self.execution
            .as_ref()
            .filter(|e| e.status == SessionStatus::Completed)
    }

    pub fn is_running(&self) -> bool {
        self.status() == Some(SessionStatus::InProgress)
    }

    pub fn is_paused(&self) -> bool {
        self.clocks.is_paused()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_some_and(SessionStatus::is_finished)
    }

    /// Whether a pattern renderer should animate.
    pub fn should_animate(&self) -> bool {
        self.is_running() && !self.is_paused()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.clocks.elapsed_secs()
    }

    pub fn attempt_secs(&self) -> f64 {
        self.clocks.attempt_secs()
    }

    pub fn current_drill_index(&self) -> Option<usize> {
        self.tracker.current_index()
    }

    pub fn current_drill(&self) -> Option<&Drill> {
        self.current_drill_index().and_then(|i| self.program.drill(i))
    }

    pub fn current_set(&self) -> Option<u32> {
        self.tracker.current_set()
    }

    pub fn current_rep(&self) -> Option<u32> {
        self.tracker.current_rep()
    }

    /// Attempts recorded so far, across all drills, in recording order.
    pub fn attempts(&self) -> &[DrillExecution] {
        self.execution
            .as_ref()
            .map(|e| e.attempts.as_slice())
            .unwrap_or(&[])
    }

    pub fn estimated_duration_secs(&self) -> u64 {
        self.cooldown_end_secs()
    }

    /// Elapsed second at which cool-down ends: the full duration estimate.
    pub fn cooldown_end_secs(&self) -> u64 {
        estimate_duration_with(&self.program, &self.settings.estimate)
    }

    /// Seconds left in a time-bound phase. `None` during drills or after completion.
    pub fn phase_remaining_secs(&self) -> Option<u64> {
        let elapsed = self.elapsed_secs();
        match self.phase {
            Phase::Warmup => Some(u64::from(self.program.warmup_duration).saturating_sub(elapsed)),
            Phase::Cooldown => Some(self.cooldown_end_secs().saturating_sub(elapsed)),
            Phase::Drills | Phase::Completed => None,
        }
    }

    /// 0.0 .. 100.0 progress against the estimated duration.
    pub fn progress_pct(&self) -> f64 {
        if self.phase == Phase::Completed {
            return 100.0;
        }
        let total = self.cooldown_end_secs();
        if total == 0 {
            return 0.0;
        }
        (self.elapsed_secs() as f64 / total as f64 * 100.0).min(100.0)
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            animate: self.should_animate(),
            current_set: self.current_set().unwrap_or(1),
            current_rep: self.current_rep().unwrap_or(1),
        }
    }

    /// Hand the current drill to a renderer. Does nothing outside the drills phase.
    pub fn render_current(&self, renderer: &mut dyn PatternRenderer) {
        if let Some(drill) = self.current_drill() {
            renderer.render(drill, self.render_state());
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            status: self.status(),
            paused: self.is_paused(),
            drill_index: self.current_drill_index(),
            drill_id: self.current_drill().map(|d| d.id.clone()),
            current_set: self.current_set(),
            current_rep: self.current_rep(),
            elapsed_secs: self.elapsed_secs(),
            attempt_secs: self.attempt_secs(),
            phase_remaining_secs: self.phase_remaining_secs(),
            progress_pct: self.progress_pct(),
            attempts_recorded: self.attempts().len(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Validate the program, create the execution record and start the
    /// elapsed clock.
    ///
    /// # Errors
    /// Returns `SessionError::Validation` for an empty program or a drill
    /// with invalid reps/sets, and `AlreadyStarted`/`Finished` when called
    /// a second time. No clock is started on error.
    pub fn start(&mut self) -> Result<Vec<Event>, SessionError> {
        if let Some(execution) = &self.execution {
            return Err(if execution.status.is_finished() {
                SessionError::Finished(execution.status)
            } else {
                SessionError::AlreadyStarted
            });
        }
        self.program.validate()?;

        let execution =
            AgilitySessionExecution::begin(self.player_id.clone(), self.program.id.clone());
        tracing::info!(
            session_id = %execution.id,
            program_id = %self.program.id,
            player_id = %self.player_id,
            drills = self.program.drills.len(),
            "session started"
        );

        let mut events = vec![Event::SessionStarted {
            session_id: execution.id,
            program_id: self.program.id.clone(),
            player_id: self.player_id.clone(),
            estimated_secs: self.cooldown_end_secs(),
            at: Utc::now(),
        }];
        self.execution = Some(execution);
        self.clocks.start_elapsed();
        self.evaluate(&mut events);
        Ok(events)
    }

    /// Advance the elapsed clock by one second and apply any time-driven
    /// phase transition. Returns no events while paused or not running.
    pub fn tick_elapsed(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.is_running() || !self.clocks.tick_elapsed() {
            return events;
        }
        self.evaluate(&mut events);
        events
    }

    /// Advance the attempt clock by 0.1 s. Only moves while a drill is
    /// active and the session is not paused. Returns whether it moved.
    pub fn tick_attempt(&mut self) -> bool {
        if !self.is_running() || self.phase != Phase::Drills || !self.tracker.has_active() {
            return false;
        }
        self.clocks.tick_attempt()
    }

    /// Record the outcome of the current rep and advance rep → set → drill.
    ///
    /// # Errors
    /// Rejects the call without touching any state when the session is not
    /// running, is not in the drills phase, has no active drill, or
    /// `completion_time` is negative or not finite.
    pub fn record_attempt(
        &mut self,
        completion_time: f64,
        errors: u32,
        notes: Option<String>,
    ) -> Result<Vec<Event>, SessionError> {
        self.ensure_running()?;
        if self.phase != Phase::Drills {
            return Err(SessionError::NotInDrills(self.phase));
        }
        if !completion_time.is_finite() || completion_time < 0.0 {
            return Err(ValidationError::InvalidCompletionTime(completion_time).into());
        }

        let (attempt, advance) = self.tracker.record(completion_time, errors, notes)?;
        tracing::debug!(
            drill_id = %attempt.drill_id,
            attempt_number = attempt.attempt_number,
            completion_time,
            errors,
            "attempt recorded"
        );
        self.clocks.reset_attempt();
        if let Some(execution) = self.execution.as_mut() {
            execution.attempts.push(attempt.clone());
        }

        let mut events = vec![Event::AttemptRecorded {
            attempt,
            at: Utc::now(),
        }];
        match advance {
            Advance::NextRep { .. } | Advance::NextSet { .. } => {}
            Advance::NextDrill { completed, next } => {
                events.push(self.drill_completed(completed));
                events.push(self.drill_started(next));
            }
            Advance::AllComplete { completed } => {
                events.push(self.drill_completed(completed));
                self.enter_cooldown(&mut events);
            }
        }
        Ok(events)
    }

    /// # Errors
    /// Returns an error if the session is not running.
    pub fn pause(&mut self) -> Result<Option<Event>, SessionError> {
        self.ensure_running()?;
        if self.clocks.is_paused() {
            return Ok(None);
        }
        self.clocks.pause();
        tracing::info!(elapsed_secs = self.elapsed_secs(), "session paused");
        Ok(Some(Event::SessionPaused {
            elapsed_secs: self.elapsed_secs(),
            attempt_secs: self.attempt_secs(),
            at: Utc::now(),
        }))
    }

    /// # Errors
    /// Returns an error if the session is not running.
    pub fn resume(&mut self) -> Result<Option<Event>, SessionError> {
        self.ensure_running()?;
        if !self.clocks.is_paused() {
            return Ok(None);
        }
        self.clocks.resume();
        tracing::info!(elapsed_secs = self.elapsed_secs(), "session resumed");
        Ok(Some(Event::SessionResumed {
            elapsed_secs: self.elapsed_secs(),
            attempt_secs: self.attempt_secs(),
            at: Utc::now(),
        }))
    }

    /// Pause when running, resume when paused.
    ///
    /// # Errors
    /// Returns an error if the session is not running.
    pub fn toggle_pause(&mut self) -> Result<Event, SessionError> {
        let event = if self.clocks.is_paused() {
            self.resume()?
        } else {
            self.pause()?
        };
        Ok(event.unwrap_or_else(|| self.snapshot()))
    }

    /// Stop both clocks and mark the record abandoned. Attempts recorded so
    /// far stay on the record; no metrics are computed.
    ///
    /// # Errors
    /// Returns an error if the session was never started or already finished.
    pub fn cancel(&mut self) -> Result<Event, SessionError> {
        self.ensure_running()?;
        self.clocks.cancel();
        let execution = self.execution.as_mut().ok_or(SessionError::NotStarted)?;
        execution.abandon();
        tracing::info!(
            session_id = %execution.id,
            phase = %self.phase,
            attempts = execution.attempts.len(),
            "session abandoned"
        );
        Ok(Event::SessionAbandoned {
            session_id: execution.id,
            phase: self.phase,
            attempts_recorded: execution.attempts.len(),
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.status() {
            None => Err(SessionError::NotStarted),
            Some(SessionStatus::InProgress) => Ok(()),
            Some(status) => Err(SessionError::Finished(status)),
        }
    }

    /// Apply time-driven transitions for the current elapsed value.
    fn evaluate(&mut self, events: &mut Vec<Event>) {
        let elapsed = self.elapsed_secs();
        match self.phase {
            Phase::Warmup => {
                let warmup = u64::from(self.program.warmup_duration);
                if elapsed >= warmup {
                    self.enter_drills(events);
                } else {
                    let remaining = warmup - elapsed;
                    if remaining <= self.settings.countdown_secs {
                        self.notify(Cue::Countdown(remaining));
                        events.push(Event::Countdown {
                            remaining_secs: remaining,
                            at: Utc::now(),
                        });
                    }
                }
            }
            Phase::Cooldown => {
                if elapsed >= self.cooldown_end_secs() {
                    self.complete(events);
                }
            }
            Phase::Drills | Phase::Completed => {}
        }
    }

    fn transition(&mut self, to: Phase, events: &mut Vec<Event>) {
        let from = self.phase;
        debug_assert!(to > from, "phases never regress");
        self.phase = to;
        tracing::info!(%from, %to, elapsed_secs = self.elapsed_secs(), "phase changed");
        events.push(Event::PhaseChanged {
            from,
            to,
            elapsed_secs: self.elapsed_secs(),
            at: Utc::now(),
        });
    }

    fn enter_drills(&mut self, events: &mut Vec<Event>) {
        self.transition(Phase::Drills, events);
        if self.tracker.activate_first() {
            self.clocks.start_attempt();
            events.push(self.drill_started(0));
        }
        self.notify(Cue::Start);
    }

    fn enter_cooldown(&mut self, events: &mut Vec<Event>) {
        self.clocks.stop_attempt();
        self.transition(Phase::Cooldown, events);
        self.notify(Cue::Complete);
    }

    fn complete(&mut self, events: &mut Vec<Event>) {
        self.transition(Phase::Completed, events);
        self.clocks.cancel();
        if let Some(execution) = self.execution.as_mut() {
            execution.seal();
            let metrics = execution.metrics.clone().unwrap_or_default();
            tracing::info!(
                session_id = %execution.id,
                attempts = metrics.attempt_count,
                success_rate = metrics.success_rate,
                "session completed"
            );
            events.push(Event::SessionCompleted {
                session_id: execution.id,
                metrics,
                at: Utc::now(),
            });
        }
    }

    fn drill_started(&self, index: usize) -> Event {
        Event::DrillStarted {
            drill_index: index,
            drill_id: self.drill_id(index),
            at: Utc::now(),
        }
    }

    fn drill_completed(&self, index: usize) -> Event {
        Event::DrillCompleted {
            drill_index: index,
            drill_id: self.drill_id(index),
            at: Utc::now(),
        }
    }

    fn drill_id(&self, index: usize) -> String {
        self.program
            .drill(index)
            .map(|d| d.id.clone())
            .unwrap_or_default()
    }

    fn notify(&mut self, cue: Cue) {
        let result = match cue {
            Cue::Start => self.notifier.play_start(),
            Cue::Countdown(remaining) => self.notifier.play_countdown(remaining),
            Cue::Complete => self.notifier.play_complete(),
        };
        if let Err(e) = result {
            tracing::warn!(?cue, error = %e, "notifier failed, continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::notify::NotifyResult;
    use crate::program::DrillCategory;
    use crate::session::DrillStatus;

    fn scenario_program() -> AgilityProgram {
        AgilityProgram::new("p1", "Shuttle Day")
            .with_warmup(5)
            .with_cooldown(5)
            .with_drill(
                Drill::new("shuttle", "Shuttle Run", DrillCategory::Acceleration)
                    .with_reps(2)
                    .with_sets(1)
                    .with_rest(30)
                    .with_target_time(10),
            )
    }

    fn tick_secs(session: &mut SessionController, secs: u64) -> Vec<Event> {
        (0..secs).flat_map(|_| session.tick_elapsed()).collect()
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recorder {
        fn play_start(&mut self) -> NotifyResult {
            self.0.lock().unwrap().push("start".into());
            Ok(())
        }
        fn play_countdown(&mut self, remaining_secs: u64) -> NotifyResult {
            self.0.lock().unwrap().push(format!("countdown {remaining_secs}"));
            Ok(())
        }
        fn play_complete(&mut self) -> NotifyResult {
            self.0.lock().unwrap().push("complete".into());
            Ok(())
        }
    }

    struct Broken;

    impl Notifier for Broken {
        fn play_start(&mut self) -> NotifyResult {
            Err("audio device unavailable".into())
        }
        fn play_complete(&mut self) -> NotifyResult {
            Err("audio device unavailable".into())
        }
    }

    #[test]
    fn scenario_runs_to_completion() {
        let mut session = SessionController::new(scenario_program(), "athlete-9");
        assert_eq!(session.estimated_duration_secs(), 60);
        session.start().unwrap();
        assert_eq!(session.phase(), Phase::Warmup);

        tick_secs(&mut session, 4);
        assert_eq!(session.phase(), Phase::Warmup);
        let events = session.tick_elapsed();
        assert_eq!(session.phase(), Phase::Drills);
        assert!(events.iter().any(|e| matches!(e, Event::DrillStarted { drill_index: 0, .. })));

        session.record_attempt(9.4, 0, None).unwrap();
        assert_eq!(session.phase(), Phase::Drills);
        assert_eq!(session.current_rep(), Some(2));
        let events = session.record_attempt(9.1, 1, None).unwrap();
        assert_eq!(session.phase(), Phase::Cooldown);
        assert_eq!(session.tracker().drills()[0].status, DrillStatus::Completed);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::PhaseChanged { from: Phase::Drills, to: Phase::Cooldown, .. }
        )));

        // Cool-down ends at warmup + estimated drills + cooldown = 60 s.
        tick_secs(&mut session, 54);
        assert_eq!(session.elapsed_secs(), 59);
        assert_eq!(session.phase(), Phase::Cooldown);
        let events = session.tick_elapsed();
        assert_eq!(session.phase(), Phase::Completed);
        assert!(events.iter().any(Event::is_terminal));

        let record = session.completed_execution().unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.attempts.len(), 2);
        assert!(record.ended_at.is_some());
        let metrics = record.metrics.as_ref().unwrap();
        assert_eq!(metrics.total_errors, 1);
        assert_eq!(metrics.best_time, 9.1);
    }

    #[test]
    fn start_rejects_empty_program() {
        let mut session = SessionController::new(AgilityProgram::new("p", "Empty"), "a");
        assert!(matches!(
            session.start(),
            Err(SessionError::Validation(ValidationError::EmptyProgram { .. }))
        ));
        assert!(session.execution().is_none());
        assert!(session.tick_elapsed().is_empty());
        assert_eq!(session.elapsed_secs(), 0);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut session = SessionController::new(scenario_program(), "a");
        session.start().unwrap();
        assert_eq!(session.start(), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn zero_warmup_enters_drills_on_start() {
        let mut session = SessionController::new(scenario_program().with_warmup(0), "a");
        let events = session.start().unwrap();
        assert_eq!(session.phase(), Phase::Drills);
        assert_eq!(session.current_drill_index(), Some(0));
        assert!(events.iter().any(|e| matches!(e, Event::PhaseChanged { to: Phase::Drills, .. })));
    }

    #[test]
    fn record_attempt_outside_drills_is_rejected() {
        let mut session = SessionController::new(scenario_program(), "a");
        assert_eq!(
            session.record_attempt(1.0, 0, None),
            Err(SessionError::NotStarted)
        );
        session.start().unwrap();
        assert_eq!(
            session.record_attempt(1.0, 0, None),
            Err(SessionError::NotInDrills(Phase::Warmup))
        );
        assert!(session.attempts().is_empty());
    }

    #[test]
    fn invalid_completion_time_leaves_tracker_alone() {
        let mut session = SessionController::new(scenario_program().with_warmup(0), "a");
        session.start().unwrap();
        assert!(matches!(
            session.record_attempt(-1.0, 0, None),
            Err(SessionError::Validation(ValidationError::InvalidCompletionTime(_)))
        ));
        assert!(session.record_attempt(f64::NAN, 0, None).is_err());
        assert_eq!(session.current_rep(), Some(1));
        assert!(session.attempts().is_empty());
    }

    #[test]
    fn attempt_clock_only_runs_in_drills() {
        let mut session = SessionController::new(scenario_program(), "a");
        session.start().unwrap();
        assert!(!session.tick_attempt());

        tick_secs(&mut session, 5);
        for _ in 0..42 {
            assert!(session.tick_attempt());
        }
        assert!((session.attempt_secs() - 4.2).abs() < 1e-9);

        session.record_attempt(4.2, 0, None).unwrap();
        assert_eq!(session.attempt_secs(), 0.0);
        session.record_attempt(4.0, 0, None).unwrap();
        assert_eq!(session.phase(), Phase::Cooldown);
        assert!(!session.tick_attempt());
    }

    #[test]
    fn pause_freezes_both_clocks() {
        let mut session = SessionController::new(scenario_program(), "a");
        session.start().unwrap();
        tick_secs(&mut session, 6);
        for _ in 0..15 {
            session.tick_attempt();
        }

        assert!(matches!(session.toggle_pause(), Ok(Event::SessionPaused { .. })));
        assert!(!session.should_animate());
        tick_secs(&mut session, 30);
        for _ in 0..100 {
            assert!(!session.tick_attempt());
        }
        assert_eq!(session.elapsed_secs(), 6);
        assert!((session.attempt_secs() - 1.5).abs() < 1e-9);

        assert!(matches!(session.toggle_pause(), Ok(Event::SessionResumed { .. })));
        session.tick_elapsed();
        session.tick_attempt();
        assert_eq!(session.elapsed_secs(), 7);
        assert!((session.attempt_secs() - 1.6).abs() < 1e-9);
        assert!(session.pause().unwrap().is_some());
        assert_eq!(session.pause().unwrap(), None);
    }

    #[test]
    fn pause_during_warmup_holds_phase() {
        let mut session = SessionController::new(scenario_program(), "a");
        session.start().unwrap();
        session.pause().unwrap();
        tick_secs(&mut session, 100);
        assert_eq!(session.phase(), Phase::Warmup);
        session.resume().unwrap();
        tick_secs(&mut session, 5);
        assert_eq!(session.phase(), Phase::Drills);
    }

    #[test]
    fn cancel_preserves_attempts_and_blocks_further_calls() {
        let mut session = SessionController::new(scenario_program().with_warmup(0), "a");
        session.start().unwrap();
        session.record_attempt(8.0, 2, Some("tripped on cone".into())).unwrap();

        let event = session.cancel().unwrap();
        assert!(matches!(
            event,
            Event::SessionAbandoned { phase: Phase::Drills, attempts_recorded: 1, .. }
        ));
        assert_eq!(session.status(), Some(SessionStatus::Abandoned));
        assert_eq!(session.attempts().len(), 1);
        assert!(session.execution().unwrap().metrics.is_none());
        assert!(session.completed_execution().is_none());

        assert_eq!(
            session.record_attempt(7.0, 0, None),
            Err(SessionError::Finished(SessionStatus::Abandoned))
        );
        assert!(session.cancel().is_err());
        assert!(session.tick_elapsed().is_empty());
        assert!(!session.tick_attempt());
        assert_eq!(session.attempts().len(), 1);
    }

    #[test]
    fn cancel_during_cooldown_abandons_without_completing() {
        let mut session = SessionController::new(scenario_program(), "a");
        session.start().unwrap();
        tick_secs(&mut session, 5);
        session.record_attempt(9.4, 0, None).unwrap();
        session.record_attempt(9.1, 1, None).unwrap();
        assert_eq!(session.phase(), Phase::Cooldown);

        tick_secs(&mut session, 20);
        let event = session.cancel().unwrap();
        assert!(matches!(
            event,
            Event::SessionAbandoned { phase: Phase::Cooldown, attempts_recorded: 2, .. }
        ));

        let record = session.execution().unwrap();
        assert_eq!(record.status, SessionStatus::Abandoned);
        assert_eq!(record.attempts.len(), 2);
        assert!(record.metrics.is_none());
        assert!(record.ended_at.is_none());

        let events = tick_secs(&mut session, 120);
        assert!(events.is_empty());
        assert_eq!(session.phase(), Phase::Cooldown);
        assert_eq!(session.status(), Some(SessionStatus::Abandoned));
    }

    #[test]
    fn cancel_before_start_is_rejected() {
        let mut session = SessionController::new(scenario_program(), "a");
        assert_eq!(session.cancel(), Err(SessionError::NotStarted));
    }

    #[test]
    fn multi_drill_multi_set_progression() {
        let program = AgilityProgram::new("p2", "Circuit")
            .with_drill(
                Drill::new("ladder", "Ladder", DrillCategory::Ladder)
                    .with_reps(2)
                    .with_sets(2),
            )
            .with_drill(Drill::new("cone", "Cone Weave", DrillCategory::Cone).with_reps(1));
        let mut session = SessionController::new(program, "a");
        session.start().unwrap();

        let mut cooldown_transitions = 0;
        for i in 0..5 {
            assert_eq!(session.phase(), Phase::Drills, "attempt {i}");
            let events = session.record_attempt(5.0, 0, None).unwrap();
            cooldown_transitions += events
                .iter()
                .filter(|e| matches!(e, Event::PhaseChanged { to: Phase::Cooldown, .. }))
                .count();
        }
        assert_eq!(cooldown_transitions, 1);
        assert_eq!(session.phase(), Phase::Cooldown);

        let numbers: Vec<(String, u32)> = session
            .attempts()
            .iter()
            .map(|a| (a.drill_id.clone(), a.attempt_number))
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("ladder".into(), 1),
                ("ladder".into(), 2),
                ("ladder".into(), 3),
                ("ladder".into(), 4),
                ("cone".into(), 1),
            ]
        );
    }

    #[test]
    fn notifier_cues_at_transitions() {
        let recorder = Recorder::default();
        let mut session = SessionController::new(scenario_program(), "a")
            .with_notifier(Box::new(recorder.clone()));
        session.start().unwrap();
        tick_secs(&mut session, 5);
        session.record_attempt(5.0, 0, None).unwrap();
        session.record_attempt(5.0, 0, None).unwrap();

        let cues = recorder.0.lock().unwrap().clone();
        assert_eq!(
            cues,
            vec!["countdown 3", "countdown 2", "countdown 1", "start", "complete"]
        );
    }

    #[test]
    fn notifier_failures_do_not_block_transitions() {
        let mut session =
            SessionController::new(scenario_program(), "a").with_notifier(Box::new(Broken));
        session.start().unwrap();
        tick_secs(&mut session, 5);
        assert_eq!(session.phase(), Phase::Drills);
        session.record_attempt(5.0, 0, None).unwrap();
        session.record_attempt(5.0, 0, None).unwrap();
        assert_eq!(session.phase(), Phase::Cooldown);
    }

    #[test]
    fn custom_estimate_defaults_move_cooldown_end() {
        let program = AgilityProgram::new("p", "Untimed")
            .with_warmup(0)
            .with_cooldown(10)
            .with_drill(Drill::new("d", "Reaction Ball", DrillCategory::Reaction).with_reps(2));
        let settings = SessionSettings {
            estimate: EstimateDefaults {
                default_rep_secs: 1,
                between_sets_rest_secs: 60,
            },
            countdown_secs: 0,
        };
        let mut session = SessionController::new(program, "a").with_settings(settings);
        assert_eq!(session.cooldown_end_secs(), 12);
        session.start().unwrap();
        session.record_attempt(1.0, 0, None).unwrap();
        session.record_attempt(1.0, 0, None).unwrap();
        tick_secs(&mut session, 11);
        assert_eq!(session.phase(), Phase::Cooldown);
        assert_eq!(session.phase_remaining_secs(), Some(1));
        tick_secs(&mut session, 1);
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(session.progress_pct(), 100.0);
    }

    #[test]
    fn renderer_sees_animation_flag() {
        struct Capture(Vec<(String, RenderState)>);
        impl PatternRenderer for Capture {
            fn render(&mut self, drill: &Drill, state: RenderState) {
                self.0.push((drill.id.clone(), state));
            }
        }

        let mut session = SessionController::new(scenario_program().with_warmup(0), "a");
        let mut capture = Capture(Vec::new());
        session.render_current(&mut capture);
        assert!(capture.0.is_empty());

        session.start().unwrap();
        session.render_current(&mut capture);
        session.pause().unwrap();
        session.render_current(&mut capture);

        assert_eq!(capture.0.len(), 2);
        assert!(capture.0[0].1.animate);
        assert!(!capture.0[1].1.animate);
        assert_eq!(capture.0[0].0, "shuttle");
    }

    #[test]
    fn state_roundtrips_through_json() {
        let mut session = SessionController::new(scenario_program().with_warmup(0), "a");
        session.start().unwrap();
        session.record_attempt(6.5, 0, None).unwrap();
        tick_secs(&mut session, 3);

        let json = serde_json::to_string(&session).unwrap();
        let mut restored: SessionController = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.phase(), Phase::Drills);
        assert_eq!(restored.current_rep(), Some(2));
        assert_eq!(restored.elapsed_secs(), 3);
        assert_eq!(restored.attempts(), session.attempts());

        restored.record_attempt(6.0, 0, None).unwrap();
        assert_eq!(restored.phase(), Phase::Cooldown);
    }

    #[test]
    fn snapshot_reflects_cursor() {
        let mut session = SessionController::new(scenario_program(), "a");
        session.start().unwrap();
        tick_secs(&mut session, 2);
        match session.snapshot() {
            Event::StateSnapshot {
                phase,
                status,
                drill_index,
                phase_remaining_secs,
                elapsed_secs,
                ..
            } => {
                assert_eq!(phase, Phase::Warmup);
                assert_eq!(status, Some(SessionStatus::InProgress));
                assert_eq!(drill_index, None);
                assert_eq!(phase_remaining_secs, Some(3));
                assert_eq!(elapsed_secs, 2);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
