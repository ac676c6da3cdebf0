//! physio - Personal rehabilitation exercise tracker
//!
//! Prescribed exercises are timed through sets, rest periods and
//! left/right sides, and completed sessions are logged locally.

pub mod db;
pub mod exercises;
pub mod runner;
pub mod settings;
pub mod timer;
pub mod tui;

pub use db::Database;
pub use timer::{TimerConfiguration, TimerEngine, TimerSnapshot};
