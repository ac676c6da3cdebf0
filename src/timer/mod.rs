//! Timer module - exercise countdown with sets, rest periods and sides
//!
//! - `config`: validated timer parameters
//! - `engine`: the phase-transition state machine
//! - `hooks`: host notifications
//! - `clock`: time sources
//! - `driver`: tokio task hosting one engine

pub mod clock;
pub mod config;
pub mod driver;
pub mod engine;
pub mod hooks;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{ConfigError, SideStrategy, TimerConfiguration, TimerSettings};
pub use driver::{Command, TimerHandle};
pub use engine::{Lifecycle, Phase, Side, TimerEngine, TimerSnapshot};
pub use hooks::{Hooks, TimerEvent, TimerObserver};
