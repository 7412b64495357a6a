//! State management module
//!
//! This module contains the timer configuration model, its persistent store,
//! countdown state and the handles shared with the HTTP handlers.

pub mod app_state;
pub mod config_store;
pub mod timer_config;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use config_store::{ConfigStore, SubscriptionId, CONFIG_FILE_NAME};
pub use timer_config::{TimerConfiguration, TimerDefinition, HAPTIC_NONE, KNOWN_HAPTICS};
pub use timer_state::{RunningTimerState, TimerPhase};
