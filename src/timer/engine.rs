//! Timer engine - countdown/rest state machine with sets and sides
//!
//! The engine holds a single `State` record. Every command mutates it
//! synchronously and `snapshot()` projects it; nothing is ever copied back.
//! Time is tracked against a phase anchor, so remaining seconds are
//! `phase_duration - floor(elapsed)` and survive pause/resume without drift.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::clock::{Clock, SystemClock};
use super::config::{SideStrategy, TimerConfiguration};
use super::hooks::{TimerEvent, TimerObserver};

/// Which duration governs the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Exercise,
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Inactive,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Read model handed to the host after every command and tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub lifecycle: Lifecycle,
    pub seconds_remaining: u32,
    pub percent_remaining: f64,
    pub current_set: u32,
    pub current_side: Option<Side>,
    /// Sets whose final exercise phase ran out (by the clock or `skip`)
    pub completed_sets: u32,
}

#[derive(Debug, Clone, Copy)]
struct State {
    lifecycle: Lifecycle,
    phase: Phase,
    set: u32,
    side: Option<Side>,
    remaining: u32,
    finished_sets: u32,
    // Some exactly while running
    anchor: Option<Instant>,
}

impl State {
    fn initial(config: &TimerConfiguration) -> Self {
        Self {
            lifecycle: Lifecycle::Inactive,
            phase: Phase::Exercise,
            set: 1,
            side: config.has_sides().then_some(Side::Left),
            remaining: config.exercise_duration(),
            finished_sets: 0,
            anchor: None,
        }
    }
}

enum Outcome {
    Continue,
    Complete,
}

pub struct TimerEngine<C: Clock = SystemClock> {
    config: TimerConfiguration,
    clock: C,
    observer: Box<dyn TimerObserver + Send>,
    state: State,
}

impl<C: Clock> TimerEngine<C> {
    pub fn new(
        config: TimerConfiguration,
        clock: C,
        observer: impl TimerObserver + Send + 'static,
    ) -> Self {
        Self {
            state: State::initial(&config),
            config,
            clock,
            observer: Box::new(observer),
        }
    }

    pub fn config(&self) -> &TimerConfiguration {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let duration = self.phase_duration();
        let percent_remaining = if duration == 0 {
            0.0
        } else {
            f64::from(self.state.remaining) / f64::from(duration) * 100.0
        };

        TimerSnapshot {
            phase: self.state.phase,
            lifecycle: self.state.lifecycle,
            seconds_remaining: self.state.remaining,
            percent_remaining,
            current_set: self.state.set,
            current_side: self.state.side,
            completed_sets: self.state.finished_sets,
        }
    }

    /// When the displayed second next changes. `None` unless running,
    /// so a host that sleeps on this never ticks a paused or reset timer.
    pub fn next_tick_at(&self) -> Option<Instant> {
        let anchor = self.state.anchor?;
        let elapsed = self.phase_duration().saturating_sub(self.state.remaining);
        Some(anchor + Duration::from_secs(u64::from(elapsed) + 1))
    }

    // === Commands ===

    /// Begin from set 1. Ignored unless inactive; use `reset` to run again.
    pub fn start(&mut self) {
        if self.state.lifecycle != Lifecycle::Inactive {
            debug!(lifecycle = ?self.state.lifecycle, "start ignored");
            return;
        }

        self.state = State::initial(&self.config);
        self.state.lifecycle = Lifecycle::Running;
        self.arm(0);
        info!(
            sets = self.config.total_sets(),
            exercise_secs = self.config.exercise_duration(),
            rest_secs = self.config.rest_duration(),
            "timer started"
        );
    }

    pub fn pause(&mut self) {
        if self.state.lifecycle != Lifecycle::Running {
            debug!(lifecycle = ?self.state.lifecycle, "pause ignored");
            return;
        }

        // Apply anything already due before freezing the countdown
        self.tick();
        if self.state.lifecycle != Lifecycle::Running {
            return;
        }

        self.state.anchor = None;
        self.state.lifecycle = Lifecycle::Paused;
        debug!(remaining = self.state.remaining, "timer paused");
    }

    pub fn resume(&mut self) {
        if self.state.lifecycle != Lifecycle::Paused {
            debug!(lifecycle = ?self.state.lifecycle, "resume ignored");
            return;
        }

        self.state.lifecycle = Lifecycle::Running;
        let elapsed = self.phase_duration().saturating_sub(self.state.remaining);
        self.arm(elapsed);
        debug!(remaining = self.state.remaining, "timer resumed");

        if self.state.remaining == 0 {
            self.transition();
        }
    }

    /// Back to inactive with initial counters. Fires no callbacks.
    pub fn reset(&mut self) {
        self.state = State::initial(&self.config);
        debug!("timer reset");
    }

    /// End the current phase now, keeping the running/paused state
    pub fn skip(&mut self) {
        if !self.is_active() {
            debug!(lifecycle = ?self.state.lifecycle, "skip ignored");
            return;
        }
        if self.state.phase == Phase::Rest && self.config.rest_duration() == 0 {
            return;
        }

        self.state.remaining = 0;
        self.transition();
    }

    /// Jump to the next set (or finish on the last one), dropping any rest
    /// and side sequencing still pending in the current set
    pub fn advance_set(&mut self) {
        if !self.is_active() {
            debug!(lifecycle = ?self.state.lifecycle, "advance_set ignored");
            return;
        }

        let mut events = vec![TimerEvent::SetComplete { set: self.state.set }];
        self.state.phase = Phase::Exercise;
        if self.state.set >= self.config.total_sets() {
            self.conclude(events, Outcome::Complete);
            return;
        }

        self.state.set += 1;
        if self.state.side == Some(Side::Right)
            && self.config.side_strategy() == SideStrategy::Alternate
        {
            self.state.side = Some(Side::Left);
            events.push(TimerEvent::SideChange { side: Side::Left });
        }
        self.conclude(events, Outcome::Continue);
    }

    /// Refresh the countdown from the clock; applies one transition when
    /// the phase has run out.
    pub fn tick(&mut self) {
        let Some(anchor) = self.state.anchor else {
            return;
        };

        let elapsed = self.clock.now().saturating_duration_since(anchor).as_secs();
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.state.remaining = self.phase_duration().saturating_sub(elapsed);

        if self.state.remaining == 0 {
            self.transition();
        }
    }

    // === Internals ===

    fn is_active(&self) -> bool {
        matches!(self.state.lifecycle, Lifecycle::Running | Lifecycle::Paused)
    }

    /// Whether finishing this exercise phase finishes the whole set
    fn on_final_side(&self) -> bool {
        match self.state.side {
            None | Some(Side::Right) => true,
            Some(Side::Left) => false,
        }
    }

    fn phase_duration(&self) -> u32 {
        match self.state.phase {
            Phase::Exercise => self.config.exercise_duration(),
            Phase::Rest => self.config.rest_duration(),
        }
    }

    /// The only place a countdown is scheduled. Replaces any previous anchor.
    fn arm(&mut self, elapsed_secs: u32) {
        if self.state.lifecycle != Lifecycle::Running {
            self.state.anchor = None;
            return;
        }
        let now = self.clock.now();
        let anchor = now
            .checked_sub(Duration::from_secs(u64::from(elapsed_secs)))
            .unwrap_or(now);
        self.state.anchor = Some(anchor);
    }

    fn transition(&mut self) {
        if self.state.phase == Phase::Exercise && self.on_final_side() {
            self.state.finished_sets += 1;
        }

        if self.state.phase == Phase::Exercise && self.config.rest_duration() > 0 {
            self.state.phase = Phase::Rest;
            self.state.remaining = self.config.rest_duration();
            self.arm(0);
            debug!(set = self.state.set, side = ?self.state.side, "rest started");
            return;
        }

        let mut events = Vec::with_capacity(2);
        let outcome = self.next_unit(&mut events);
        self.conclude(events, outcome);
    }

    /// Moves set/side forward after an exercise (and its rest) finishes
    fn next_unit(&mut self, events: &mut Vec<TimerEvent>) -> Outcome {
        let last_set = self.state.set >= self.config.total_sets();
        let strategy = self.config.side_strategy();
        let s = &mut self.state;

        match (s.side, strategy) {
            (None, _) | (Some(Side::Right), SideStrategy::Alternate) => {
                events.push(TimerEvent::SetComplete { set: s.set });
                if last_set {
                    return Outcome::Complete;
                }
                s.set += 1;
                if s.side.is_some() {
                    s.side = Some(Side::Left);
                }
            }
            (Some(Side::Left), SideStrategy::Alternate) => {
                s.side = Some(Side::Right);
                events.push(TimerEvent::SideChange { side: Side::Right });
            }
            (Some(Side::Left), SideStrategy::Sequential) => {
                if last_set {
                    s.set = 1;
                    s.side = Some(Side::Right);
                    events.push(TimerEvent::SideChange { side: Side::Right });
                } else {
                    events.push(TimerEvent::SetComplete { set: s.set });
                    s.set += 1;
                }
            }
            (Some(Side::Right), SideStrategy::Sequential) => {
                events.push(TimerEvent::SetComplete { set: s.set });
                if last_set {
                    return Outcome::Complete;
                }
                s.set += 1;
            }
        }

        Outcome::Continue
    }

    /// Commits the outcome, notifies the host, then arms the next phase
    fn conclude(&mut self, mut events: Vec<TimerEvent>, outcome: Outcome) {
        match outcome {
            Outcome::Complete => {
                self.state.lifecycle = Lifecycle::Completed;
                self.state.anchor = None;
                self.state.remaining = 0;
                events.push(TimerEvent::Complete);
                info!(sets = self.config.total_sets(), "timer completed");
                self.notify(&events);
            }
            Outcome::Continue => {
                self.state.phase = Phase::Exercise;
                self.state.remaining = self.config.exercise_duration();
                self.state.anchor = None;
                debug!(set = self.state.set, side = ?self.state.side, "exercise started");
                self.notify(&events);
                self.arm(0);
            }
        }
    }

    fn notify(&mut self, events: &[TimerEvent]) {
        for &event in events {
            let observer = &mut self.observer;
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| match event {
                TimerEvent::SetComplete { set } => observer.on_set_complete(set),
                TimerEvent::SideChange { side } => observer.on_side_change(side),
                TimerEvent::Complete => observer.on_complete(),
            }));
            if delivered.is_err() {
                error!(?event, "timer observer panicked");
            }
        }
    }
}
