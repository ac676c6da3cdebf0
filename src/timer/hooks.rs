//! Host notifications fired on phase transitions

use serde::Serialize;

use super::engine::Side;

/// What happened at a transition, for hosts that prefer messages over callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    SetComplete { set: u32 },
    SideChange { side: Side },
    Complete,
}

/// Receives transition notifications. Every method defaults to a no-op.
pub trait TimerObserver {
    /// A set finished; `set` is the number just left
    fn on_set_complete(&mut self, _set: u32) {}

    /// The active side flipped; `side` is the new side
    fn on_side_change(&mut self, _side: Side) {}

    /// All sets (and sides) are done. Fired exactly once.
    fn on_complete(&mut self) {}
}

impl TimerObserver for () {}

impl TimerObserver for std::sync::mpsc::Sender<TimerEvent> {
    fn on_set_complete(&mut self, set: u32) {
        let _ = self.send(TimerEvent::SetComplete { set });
    }

    fn on_side_change(&mut self, side: Side) {
        let _ = self.send(TimerEvent::SideChange { side });
    }

    fn on_complete(&mut self) {
        let _ = self.send(TimerEvent::Complete);
    }
}

impl TimerObserver for tokio::sync::mpsc::UnboundedSender<TimerEvent> {
    fn on_set_complete(&mut self, set: u32) {
        let _ = self.send(TimerEvent::SetComplete { set });
    }

    fn on_side_change(&mut self, side: Side) {
        let _ = self.send(TimerEvent::SideChange { side });
    }

    fn on_complete(&mut self) {
        let _ = self.send(TimerEvent::Complete);
    }
}

type SetHook = Box<dyn FnMut(u32) + Send>;
type SideHook = Box<dyn FnMut(Side) + Send>;
type CompleteHook = Box<dyn FnMut() + Send>;

/// Three optional closures, for hosts that only care about some transitions
#[derive(Default)]
pub struct Hooks {
    on_set_complete: Option<SetHook>,
    on_side_change: Option<SideHook>,
    on_complete: Option<CompleteHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set_complete(mut self, f: impl FnMut(u32) + Send + 'static) -> Self {
        self.on_set_complete = Some(Box::new(f));
        self
    }

    pub fn with_side_change(mut self, f: impl FnMut(Side) + Send + 'static) -> Self {
        self.on_side_change = Some(Box::new(f));
        self
    }

    pub fn with_complete(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl TimerObserver for Hooks {
    fn on_set_complete(&mut self, set: u32) {
        if let Some(f) = self.on_set_complete.as_mut() {
            f(set);
        }
    }

    fn on_side_change(&mut self, side: Side) {
        if let Some(f) = self.on_side_change.as_mut() {
            f(side);
        }
    }

    fn on_complete(&mut self) {
        if let Some(f) = self.on_complete.as_mut() {
            f();
        }
    }
}
