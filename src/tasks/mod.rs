//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod config_watcher;

// Re-export main types
pub use config_watcher::ConfigWatcher;
