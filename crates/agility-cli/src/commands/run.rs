use std::path::PathBuf;

use agility_core::{
    AgilityProgram, Config, Event, RunnerError, SessionController, SessionHandle, SessionRunner,
    SessionStore,
};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};

#[derive(Args)]
pub struct RunArgs {
    /// Program file (.toml or .json)
    file: PathBuf,
    /// Player id (defaults to session.default_player)
    #[arg(long)]
    player: Option<String>,
    /// Do not store the finished session
    #[arg(long)]
    no_save: bool,
}

/// One line of coach input.
#[derive(Debug, PartialEq)]
enum Input {
    Attempt {
        completion_time: f64,
        errors: u32,
        notes: Option<String>,
    },
    TogglePause,
    Status,
    Cancel,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().ok_or("empty input")?;
    match cmd {
        "a" => {
            let completion_time = parts
                .next()
                .ok_or("usage: a <secs> <errors> [notes]")?
                .parse::<f64>()
                .map_err(|e| format!("bad completion time: {e}"))?;
            let errors = match parts.next() {
                Some(s) => s.parse::<u32>().map_err(|e| format!("bad error count: {e}"))?,
                None => 0,
            };
            let notes: Vec<&str> = parts.collect();
            let notes = if notes.is_empty() {
                None
            } else {
                Some(notes.join(" "))
            };
            Ok(Input::Attempt {
                completion_time,
                errors,
                notes,
            })
        }
        "p" => Ok(Input::TogglePause),
        "s" => Ok(Input::Status),
        "c" => Ok(Input::Cancel),
        other => Err(format!("unknown command '{other}' (a, p, s, c)")),
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let program = AgilityProgram::load(&args.file)?;
    let player = args
        .player
        .unwrap_or_else(|| config.session.default_player.clone());

    let controller = SessionController::new(program, player)
        .with_settings(config.session_settings())
        .with_notifier(config.notifier());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let record = runtime.block_on(drive(controller))?;

    if args.no_save {
        return Ok(());
    }
    let store = SessionStore::open()?;
    store.save(&record)?;
    eprintln!("session saved: {}", record.id);
    Ok(())
}

async fn drive(
    controller: SessionController,
) -> Result<agility_core::AgilitySessionExecution, Box<dyn std::error::Error>> {
    let runner = SessionRunner::new(controller);
    let events = runner.subscribe();
    let handle = runner.start()?;

    let (done_tx, mut done_rx) = oneshot::channel();
    let printer = tokio::spawn(print_events(events, done_tx));

    eprintln!("commands: a <secs> <errors> [notes] | p (pause/resume) | s (status) | c (cancel)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut done_rx => break,
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => apply(&handle, &line).await,
                None => {
                    if !handle.is_finished() {
                        tracing::info!("input closed, cancelling session");
                        let _ = handle.cancel().await;
                    }
                    break;
                }
            },
        }
    }

    let record = handle.finished().await?;
    let _ = printer.await;
    Ok(record)
}

async fn apply(handle: &SessionHandle, line: &str) {
    let input = match parse_input(line) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };

    let result = match input {
        Input::Attempt {
            completion_time,
            errors,
            notes,
        } => handle
            .record_attempt(completion_time, errors, notes)
            .await
            .map(|_| ()),
        Input::TogglePause => handle.toggle_pause().await.map(|_| ()),
        Input::Status => handle.snapshot().await.map(|snapshot| print_event(&snapshot)),
        Input::Cancel => handle.cancel().await.map(|_| ()),
    };

    match result {
        Ok(()) => {}
        Err(RunnerError::Session(e)) => eprintln!("rejected: {e}"),
        Err(e) => eprintln!("error: {e}"),
    }
}

async fn print_events(mut events: broadcast::Receiver<Event>, done: oneshot::Sender<()>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                print_event(&event);
                if event.is_terminal() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    let _ = done.send(());
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to encode event"),
    }
}
