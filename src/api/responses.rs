//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of POST /api/haptic-preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticPreviewRequest {
    #[serde(rename = "hapticName")]
    pub haptic_name: String,
}

/// Result of POST /api/restore-defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreDefaultsResponse {
    /// Presets that were missing and have been added
    pub added: usize,
    /// Timers in the configuration afterwards
    pub timers: usize,
    pub timestamp: DateTime<Utc>,
}

impl RestoreDefaultsResponse {
    pub fn new(added: usize, timers: usize) -> Self {
        Self {
            added,
            timers,
            timestamp: Utc::now(),
        }
    }
}
