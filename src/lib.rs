//! Haptic Timers - configurable countdown timers with haptic feedback
//!
//! This library provides the persistent timer configuration with hot reload,
//! the loopback settings server that edits it, and the countdown engine that
//! runs configured timers and raises their haptic events.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::{create_router, ConfigServer};
pub use config::Config;
pub use engine::{TimerEngine, TriggerOutcome};
pub use error::TimerError;
pub use state::{ConfigStore, TimerConfiguration, TimerDefinition};
pub use utils::signals::shutdown_signal;
