//! Timer engine module
//!
//! Turns button presses into countdowns for configured timers, raises the
//! configured haptic when a countdown elapses and formats button labels.

pub mod display;
pub mod timer_engine;

// Re-export main types
pub use timer_engine::{TimerEngine, TriggerOutcome, PARAMETER_GROUP};
