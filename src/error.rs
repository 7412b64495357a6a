//! Error types shared by the store, the engine and the HTTP server

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while loading, saving or running timers.
///
/// None of these are fatal to the process: the store falls back to defaults
/// or keeps its in-memory state, the server maps them to status codes and the
/// engine ignores the offending trigger.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("failed to load timer configuration from {path}: {message}")]
    ConfigurationLoad { path: PathBuf, message: String },

    #[error("failed to save timer configuration to {path}: {message}")]
    ConfigurationSave { path: PathBuf, message: String },

    #[error("request could not be processed: {0}")]
    RequestProcessing(String),

    #[error("timer not found: {0}")]
    TimerNotFound(String),

    #[error("timer {id} has no duration and cannot run")]
    TimerNotRunnable { id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TimerError {
    pub(crate) fn load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ConfigurationLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn save(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ConfigurationSave {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
