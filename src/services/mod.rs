//! Host device integration module
//!
//! This module contains the interfaces through which the timers reach the
//! physical control device: haptic playback, button redraws and the list of
//! bindable timers.

pub mod host;

// Re-export main types
pub use host::*;
