//! Headless runner - times one exercise on the async driver, commands from stdin

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::db::{Database, Progress};
use crate::timer::{Command, Lifecycle, Phase, TimerEvent, TimerSnapshot, driver};
use crate::tui::format_clock;

/// What a line typed on stdin asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Timer(Command),
    Abort,
}

pub fn parse_input(line: &str) -> Option<Input> {
    match line.trim() {
        "p" | "pause" => Some(Input::Timer(Command::Pause)),
        "r" | "resume" => Some(Input::Timer(Command::Resume)),
        "s" | "skip" => Some(Input::Timer(Command::Skip)),
        "n" | "next" => Some(Input::Timer(Command::AdvanceSet)),
        "x" | "q" | "quit" => Some(Input::Abort),
        _ => None,
    }
}

fn describe(snap: &TimerSnapshot, total_sets: u32) -> String {
    let phase = match snap.phase {
        Phase::Exercise => "exercise",
        Phase::Rest => "rest",
    };
    let side = snap.current_side.map(|s| format!(" {}", s.label())).unwrap_or_default();
    let paused = if snap.lifecycle == Lifecycle::Paused { " (paused)" } else { "" };
    format!(
        "set {}/{}{} {} {}{}",
        snap.current_set,
        total_sets,
        side,
        phase,
        format_clock(snap.seconds_remaining),
        paused
    )
}

/// Time `exercise_id` to completion (or abort) and log progress when it completes
pub async fn run_exercise(db: &Database, exercise_id: i64) -> Result<()> {
    let Some(exercise) = db.get_exercise(exercise_id)? else {
        bail!("no exercise with id {}", exercise_id);
    };
    let settings = db.load_settings()?;
    let config = exercise
        .timer_config(&settings)
        .with_context(|| format!("cannot time {}", exercise.name))?;
    let total_sets = config.total_sets();

    println!("{} - {}", exercise.name, exercise.prescription());
    println!("p: pause | r: resume | s: skip | n: next set | x: abort");

    let (event_tx, mut events) = mpsc::unbounded_channel::<TimerEvent>();
    let handle = driver::spawn(config, event_tx);
    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let started_at = Utc::now();
    let mut completed = false;
    let mut stdin_open = true;
    let mut watching = true;

    handle.send(Command::Start);

    loop {
        tokio::select! {
            changed = snapshots.changed(), if watching => {
                // Driver gone; its remaining events still drain below
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let snap = snapshots.borrow_and_update().clone();
                if snap.lifecycle != Lifecycle::Completed {
                    println!("{}", describe(&snap, total_sets));
                }
            }
            event = events.recv() => match event {
                Some(TimerEvent::SetComplete { set }) => println!("set {} done", set),
                Some(TimerEvent::SideChange { side }) => println!("switch to {} side", side.label()),
                Some(TimerEvent::Complete) => {
                    completed = true;
                    break;
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_input(&line) {
                    Some(Input::Timer(command)) => {
                        handle.send(command);
                    }
                    Some(Input::Abort) => {
                        handle.send(Command::Reset);
                        println!("aborted");
                        break;
                    }
                    None => println!("unknown command: {}", line.trim()),
                },
                // stdin closed: keep the timer running without input
                None => stdin_open = false,
            },
        }
    }

    let last = handle.shutdown().await?;
    finish(db, exercise_id, &exercise.name, last.completed_sets, started_at, completed)
}

fn finish(
    db: &Database,
    exercise_id: i64,
    name: &str,
    completed_sets: u32,
    started_at: chrono::DateTime<Utc>,
    completed: bool,
) -> Result<()> {
    if !completed {
        return Ok(());
    }

    let progress = Progress {
        id: None,
        exercise_id,
        completed_sets: completed_sets as i32,
        completed_at: Utc::now(),
        duration_secs: Some((Utc::now() - started_at).num_seconds() as i32),
    };
    if let Err(e) = db.add_progress(&progress) {
        error!("Failed to record progress: {}", e);
        return Err(e);
    }
    info!(exercise = %name, sets = completed_sets, "progress recorded");
    println!("Logged: {} ({} sets)", name, completed_sets);
    Ok(())
}
