//! Real-time driver for a [`SessionController`].
//!
//! One tokio task owns the controller and is the only code that mutates it.
//! It selects over the 1 s elapsed interval, the 100 ms attempt interval and
//! a command channel, so ticks and external commands are applied strictly
//! one at a time. Events fan out to subscribers over a broadcast channel.
//!
//! The task exits when the session completes or is abandoned and returns the
//! final record through [`SessionHandle::finished`]. Dropping every handle
//! cancels the session.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::controller::SessionController;
use super::execution::AgilitySessionExecution;
use crate::error::{RunnerError, SessionError};
use crate::events::Event;
use crate::timer::{ATTEMPT_PERIOD, ELAPSED_PERIOD};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    RecordAttempt {
        completion_time: f64,
        errors: u32,
        notes: Option<String>,
        reply: Reply<Vec<Event>>,
    },
    Pause(Reply<Option<Event>>),
    Resume(Reply<Option<Event>>),
    TogglePause(Reply<Event>),
    Cancel(Reply<Event>),
    Snapshot(oneshot::Sender<Event>),
}

/// Owns a controller until it is started on the tokio runtime.
pub struct SessionRunner {
    controller: SessionController,
    events: broadcast::Sender<Event>,
}

impl SessionRunner {
    pub fn new(controller: SessionController) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { controller, events }
    }

    /// Subscribe before `start()` to see the start events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Start the session and spawn its driver task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns the controller's start error (for example an empty program);
    /// no task is spawned in that case.
    pub fn start(mut self) -> Result<SessionHandle, SessionError> {
        let started = self.controller.start()?;
        publish(&self.events, started);

        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(drive(self.controller, rx, self.events.clone()));
        Ok(SessionHandle {
            commands,
            events: self.events,
            task,
        })
    }
}

/// Client side of a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
    task: JoinHandle<Option<AgilitySessionExecution>>,
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Whether the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// # Errors
    /// Returns `RunnerError::Session` when the controller rejects the
    /// attempt, or `RunnerError::Stopped` after the session has ended.
    pub async fn record_attempt(
        &self,
        completion_time: f64,
        errors: u32,
        notes: Option<String>,
    ) -> Result<Vec<Event>, RunnerError> {
        self.request(|reply| Command::RecordAttempt {
            completion_time,
            errors,
            notes,
            reply,
        })
        .await
    }

    /// # Errors
    /// Returns an error if the session has ended.
    pub async fn pause(&self) -> Result<Option<Event>, RunnerError> {
        self.request(Command::Pause).await
    }

    /// # Errors
    /// Returns an error if the session has ended.
    pub async fn resume(&self) -> Result<Option<Event>, RunnerError> {
        self.request(Command::Resume).await
    }

    /// # Errors
    /// Returns an error if the session has ended.
    pub async fn toggle_pause(&self) -> Result<Event, RunnerError> {
        self.request(Command::TogglePause).await
    }

    /// # Errors
    /// Returns an error if the session has already ended.
    pub async fn cancel(&self) -> Result<Event, RunnerError> {
        self.request(Command::Cancel).await
    }

    /// # Errors
    /// Returns `RunnerError::Stopped` once the session has ended.
    pub async fn snapshot(&self) -> Result<Event, RunnerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .await
            .map_err(|_| RunnerError::Stopped)?;
        rx.await.map_err(|_| RunnerError::Stopped)
    }

    /// Wait for the session to end and return its record.
    ///
    /// # Errors
    /// Returns an error if the driver task failed.
    pub async fn finished(self) -> Result<AgilitySessionExecution, RunnerError> {
        let SessionHandle { commands, task, .. } = self;
        // Keep the channel open so waiting does not cancel the session.
        let record = task.await?;
        drop(commands);
        record.ok_or(RunnerError::Stopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, RunnerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| RunnerError::Stopped)?;
        Ok(rx.await.map_err(|_| RunnerError::Stopped)??)
    }
}

fn publish(events: &broadcast::Sender<Event>, batch: impl IntoIterator<Item = Event>) {
    for event in batch {
        // No subscribers is fine.
        let _ = events.send(event);
    }
}

async fn drive(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
) -> Option<AgilitySessionExecution> {
    let now = Instant::now();
    let mut elapsed = time::interval_at(now + ELAPSED_PERIOD, ELAPSED_PERIOD);
    let mut attempt = time::interval_at(now + ATTEMPT_PERIOD, ATTEMPT_PERIOD);
    elapsed.set_missed_tick_behavior(MissedTickBehavior::Delay);
    attempt.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !controller.is_finished() {
        tokio::select! {
            _ = elapsed.tick() => {
                publish(&events, controller.tick_elapsed());
            }
            _ = attempt.tick() => {
                controller.tick_attempt();
            }
            command = commands.recv() => match command {
                Some(command) => {
                    if handle(&mut controller, command, &events) {
                        // Next ticks land one full period after the resume.
                        elapsed.reset();
                        attempt.reset();
                    }
                }
                None => {
                    tracing::debug!("all session handles dropped, cancelling");
                    if let Ok(event) = controller.cancel() {
                        publish(&events, [event]);
                    }
                }
            },
        }
    }
    controller.into_execution()
}

/// Apply one command. Returns `true` when the session was resumed.
fn handle(controller: &mut SessionController, command: Command, events: &broadcast::Sender<Event>) -> bool {
    let was_paused = controller.is_paused();
    match command {
        Command::RecordAttempt {
            completion_time,
            errors,
            notes,
            reply,
        } => {
            let result = controller.record_attempt(completion_time, errors, notes);
            if let Ok(batch) = &result {
                publish(events, batch.iter().cloned());
            }
            let _ = reply.send(result);
        }
        Command::Pause(reply) => {
            let result = controller.pause();
            if let Ok(Some(event)) = &result {
                publish(events, [event.clone()]);
            }
            let _ = reply.send(result);
        }
        Command::Resume(reply) => {
            let result = controller.resume();
            if let Ok(Some(event)) = &result {
                publish(events, [event.clone()]);
            }
            let _ = reply.send(result);
        }
        Command::TogglePause(reply) => {
            let result = controller.toggle_pause();
            if let Ok(event) = &result {
                publish(events, [event.clone()]);
            }
            let _ = reply.send(result);
        }
        Command::Cancel(reply) => {
            let result = controller.cancel();
            if let Ok(event) = &result {
                publish(events, [event.clone()]);
            }
            let _ = reply.send(result);
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(controller.snapshot());
        }
    }
    was_paused && !controller.is_paused() && !controller.is_finished()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::program::{AgilityProgram, Drill, DrillCategory};
    use crate::session::{Phase, SessionStatus};

    fn program() -> AgilityProgram {
        AgilityProgram::new("p1", "Shuttle Day")
            .with_warmup(5)
            .with_cooldown(5)
            .with_drill(
                Drill::new("shuttle", "Shuttle Run", DrillCategory::Acceleration)
                    .with_reps(2)
                    .with_rest(30)
                    .with_target_time(10),
            )
    }

    fn phase_of(event: &Event) -> Phase {
        match event {
            Event::StateSnapshot { phase, .. } => *phase,
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_session_in_virtual_time() {
        let runner = SessionRunner::new(SessionController::new(program(), "athlete-1"));
        let mut rx = runner.subscribe();
        let handle = runner.start().unwrap();

        tokio::time::sleep(Duration::from_millis(5_050)).await;
        assert_eq!(phase_of(&handle.snapshot().await.unwrap()), Phase::Drills);

        handle.record_attempt(9.0, 0, None).await.unwrap();
        let events = handle.record_attempt(9.5, 1, None).await.unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PhaseChanged { to: Phase::Cooldown, .. })));

        let record = handle.finished().await.unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.attempts.len(), 2);
        assert_eq!(record.metrics.unwrap().total_errors, 1);

        let mut saw_started = false;
        let mut saw_completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::SessionStarted { .. } => saw_started = true,
                Event::SessionCompleted { .. } => saw_completed = true,
                _ => {}
            }
        }
        assert!(saw_started && saw_completed);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_clock_advances_in_tenths() {
        let handle = SessionRunner::new(SessionController::new(program().with_warmup(0), "a"))
            .start()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2_350)).await;
        match handle.snapshot().await.unwrap() {
            Event::StateSnapshot { attempt_secs, elapsed_secs, .. } => {
                assert!((attempt_secs - 2.3).abs() < 1e-9);
                assert_eq!(elapsed_secs, 2);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
        handle.cancel().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_time() {
        let handle = SessionRunner::new(SessionController::new(program(), "a"))
            .start()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2_050)).await;
        assert!(matches!(handle.pause().await.unwrap(), Some(Event::SessionPaused { elapsed_secs: 2, .. })));

        tokio::time::sleep(Duration::from_secs(100)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(matches!(snapshot, Event::StateSnapshot { elapsed_secs: 2, paused: true, phase: Phase::Warmup, .. }));

        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(matches!(snapshot, Event::StateSnapshot { elapsed_secs: 3, paused: false, .. }));
        handle.cancel().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn resume_between_ticks_gains_no_time() {
        let handle = SessionRunner::new(SessionController::new(program().with_warmup(0), "a"))
            .start()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(2_050)).await;
        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100_900)).await;
        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        match handle.snapshot().await.unwrap() {
            Event::StateSnapshot { elapsed_secs, attempt_secs, .. } => {
                assert_eq!(elapsed_secs, 2);
                assert!((attempt_secs - 2.1).abs() < 1e-9);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }

        // Repeated cycles do not accumulate drift either.
        for _ in 0..5 {
            handle.toggle_pause().await.unwrap();
            tokio::time::sleep(Duration::from_millis(3_700)).await;
            handle.toggle_pause().await.unwrap();
        }
        match handle.snapshot().await.unwrap() {
            Event::StateSnapshot { elapsed_secs, paused, .. } => {
                assert_eq!(elapsed_secs, 2);
                assert!(!paused);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
        handle.cancel().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_returns_abandoned_record() {
        let handle = SessionRunner::new(SessionController::new(program().with_warmup(0), "a"))
            .start()
            .unwrap();

        handle.record_attempt(7.25, 0, None).await.unwrap();
        let event = handle.cancel().await.unwrap();
        assert!(matches!(event, Event::SessionAbandoned { attempts_recorded: 1, .. }));

        assert!(handle.record_attempt(7.0, 0, None).await.is_err());

        let record = handle.finished().await.unwrap();
        assert_eq!(record.status, SessionStatus::Abandoned);
        assert_eq!(record.attempts.len(), 1);
        assert!(record.metrics.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_commands_surface_session_errors() {
        let handle = SessionRunner::new(SessionController::new(program(), "a"))
            .start()
            .unwrap();

        let err = handle.record_attempt(5.0, 0, None).await.unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Session(SessionError::NotInDrills(Phase::Warmup))
        ));
        handle.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_program_never_spawns() {
        let runner = SessionRunner::new(SessionController::new(AgilityProgram::new("p", "Empty"), "a"));
        assert!(matches!(runner.start(), Err(SessionError::Validation(_))));
    }
}
