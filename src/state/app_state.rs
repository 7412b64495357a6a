//! Shared state handed to the HTTP handlers

use std::sync::Arc;

use super::ConfigStore;
use crate::services::HapticSink;

/// Process-scoped handles used by every request
///
/// Requests keep no mutable state of their own; all configuration reads and
/// writes go through the store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub haptics: Arc<dyn HapticSink>,
}

impl AppState {
    pub fn new(store: Arc<ConfigStore>, haptics: Arc<dyn HapticSink>) -> Self {
        Self { store, haptics }
    }
}
