//! Async timer driver - one tokio task owns one engine
//!
//! The task keeps a single `sleep_until(next_tick_at)` future. It is rebuilt
//! after every command or tick, and dropping the old future is what cancels
//! it, so a paused or reset timer has nothing left to fire.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant as TokioInstant, sleep_until};
use tracing::{debug, info};

use super::clock::{Clock, TokioClock};
use super::config::TimerConfiguration;
use super::engine::{Lifecycle, TimerEngine, TimerSnapshot};
use super::hooks::TimerObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    Skip,
    AdvanceSet,
}

/// Host side of a running driver task
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<TimerSnapshot>,
    task: JoinHandle<TimerSnapshot>,
}

impl TimerHandle {
    /// Queue a command. Returns false once the task has finished.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    /// Wait for the timer to complete; yields the final snapshot
    pub async fn finished(self) -> anyhow::Result<TimerSnapshot> {
        let TimerHandle { commands, task, .. } = self;
        // Keep the sender alive so the task runs to completion
        let snapshot = task.await?;
        drop(commands);
        Ok(snapshot)
    }

    /// Stop the task without waiting for completion
    pub async fn shutdown(self) -> anyhow::Result<TimerSnapshot> {
        let TimerHandle { commands, task, .. } = self;
        drop(commands);
        Ok(task.await?)
    }
}

/// Spawn a driver task for `config`. The engine starts inactive; send
/// `Command::Start` to begin.
pub fn spawn(
    config: TimerConfiguration,
    observer: impl TimerObserver + Send + 'static,
) -> TimerHandle {
    let engine = TimerEngine::new(config, TokioClock, observer);
    let (commands, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshots) = watch::channel(engine.snapshot());

    let task = tokio::spawn(run(engine, rx, snapshot_tx));
    TimerHandle {
        commands,
        snapshots,
        task,
    }
}

async fn run(
    mut engine: TimerEngine<TokioClock>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<TimerSnapshot>,
) -> TimerSnapshot {
    debug!("timer driver started");

    loop {
        let deadline = engine.next_tick_at().map(TokioInstant::from_std);

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("timer handle dropped, stopping driver");
                    break;
                };
                apply(&mut engine, command);
            }
            _ = sleep_until(deadline.unwrap_or_else(TokioInstant::now)), if deadline.is_some() => {
                engine.tick();
            }
        }

        snapshots.send_replace(engine.snapshot());

        if engine.lifecycle() == Lifecycle::Completed {
            info!("timer driver finished");
            break;
        }
    }

    engine.snapshot()
}

fn apply<C: Clock>(engine: &mut TimerEngine<C>, command: Command) {
    debug!(?command, "timer command");
    match command {
        Command::Start => engine.start(),
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Reset => engine.reset(),
        Command::Skip => engine.skip(),
        Command::AdvanceSet => engine.advance_set(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::config::SideStrategy;
    use crate::timer::engine::{Phase, Side};
    use crate::timer::hooks::TimerEvent;
    use std::time::Duration;

    fn config(exercise: i64, rest: i64, sets: i64) -> TimerConfiguration {
        TimerConfiguration::new(exercise, rest, sets, false, SideStrategy::Alternate).unwrap()
    }

    // Let the driver task drain its queue
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_completion_on_clock() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerEvent>();
        let handle = spawn(config(3, 2, 2), tx);
        handle.send(Command::Start);

        let snapshot = handle.finished().await.unwrap();
        assert_eq!(snapshot.lifecycle, Lifecycle::Completed);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                TimerEvent::SetComplete { set: 1 },
                TimerEvent::SetComplete { set: 2 },
                TimerEvent::Complete,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_follow_the_clock() {
        let handle = spawn(config(3, 2, 2), ());
        handle.send(Command::Start);
        settle().await;

        tokio::time::sleep(Duration::from_millis(3100)).await;
        settle().await;
        let snap = handle.snapshot();
        assert_eq!(snap.phase, Phase::Rest);
        assert_eq!(snap.seconds_remaining, 2);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle().await;
        let snap = handle.snapshot();
        assert_eq!(snap.phase, Phase::Exercise);
        assert_eq!(snap.current_set, 2);
        assert_eq!(snap.seconds_remaining, 3);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_ticks() {
        let handle = spawn(config(10, 0, 1), ());
        handle.send(Command::Start);
        settle().await;

        tokio::time::sleep(Duration::from_millis(4200)).await;
        handle.send(Command::Pause);
        settle().await;
        assert_eq!(handle.snapshot().lifecycle, Lifecycle::Paused);
        assert_eq!(handle.snapshot().seconds_remaining, 6);

        tokio::time::sleep(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(handle.snapshot().seconds_remaining, 6);

        handle.send(Command::Resume);
        settle().await;
        assert_eq!(handle.snapshot().seconds_remaining, 6);

        let snapshot = handle.finished().await.unwrap();
        assert_eq!(snapshot.lifecycle, Lifecycle::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_skip_and_advance() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerEvent>();
        let sided = TimerConfiguration::new(30, 10, 2, true, SideStrategy::Alternate).unwrap();
        let handle = spawn(sided, tx);

        handle.send(Command::Start);
        handle.send(Command::Skip);
        handle.send(Command::Skip);
        settle().await;
        let snap = handle.snapshot();
        assert_eq!(snap.current_side, Some(Side::Right));
        assert_eq!(snap.phase, Phase::Exercise);

        handle.send(Command::AdvanceSet);
        handle.send(Command::AdvanceSet);
        let snapshot = handle.finished().await.unwrap();
        assert_eq!(snapshot.lifecycle, Lifecycle::Completed);

        let mut completes = 0;
        while let Ok(event) = rx.try_recv() {
            if event == TimerEvent::Complete {
                completes += 1;
            }
        }
        assert_eq!(completes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_inactive() {
        let handle = spawn(config(5, 0, 3), ());
        handle.send(Command::Start);
        handle.send(Command::Skip);
        handle.send(Command::Reset);
        settle().await;

        let snap = handle.snapshot();
        assert_eq!(snap.lifecycle, Lifecycle::Inactive);
        assert_eq!(snap.current_set, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(handle.snapshot().lifecycle, Lifecycle::Inactive);

        let last = handle.shutdown().await.unwrap();
        assert_eq!(last.lifecycle, Lifecycle::Inactive);
    }
}
