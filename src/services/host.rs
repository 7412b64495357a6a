//! Interfaces to the host device that runs the timers

use std::sync::Arc;
use tracing::{debug, info};

/// Plays named haptic events on the control device
pub trait HapticSink: Send + Sync {
    /// Fire-and-forget; must be callable from any thread
    fn raise_event(&self, name: &str);
}

/// Asks the host to redraw button images
pub trait DisplayRefresh: Send + Sync {
    /// `None` refreshes every button bound to the action
    fn on_image_changed(&self, action_parameter: Option<&str>);
}

/// Keeps the host's list of bindable timers in sync
pub trait ParameterRegistry: Send + Sync {
    fn add_parameter(&self, id: &str, display_name: &str, group: &str);
    fn remove_parameter(&self, id: &str);
}

/// The host collaborators a timer engine talks to
#[derive(Clone)]
pub struct HostBindings {
    pub haptics: Arc<dyn HapticSink>,
    pub display: Arc<dyn DisplayRefresh>,
    pub parameters: Arc<dyn ParameterRegistry>,
}

impl HostBindings {
    /// Use one object for all three roles
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: HapticSink + DisplayRefresh + ParameterRegistry + 'static,
    {
        Self {
            haptics: host.clone(),
            display: host.clone(),
            parameters: host,
        }
    }
}

/// Host stand-in that only reports what it was asked to do
#[derive(Debug, Default)]
pub struct LoggingHost;

impl HapticSink for LoggingHost {
    fn raise_event(&self, name: &str) {
        info!("Haptic event: {}", name);
    }
}

impl DisplayRefresh for LoggingHost {
    fn on_image_changed(&self, action_parameter: Option<&str>) {
        debug!("Image changed: {}", action_parameter.unwrap_or("<all>"));
    }
}

impl ParameterRegistry for LoggingHost {
    fn add_parameter(&self, id: &str, display_name: &str, group: &str) {
        info!("Parameter added: {} - {} [{}]", id, display_name, group);
    }

    fn remove_parameter(&self, id: &str) {
        info!("Parameter removed: {}", id);
    }
}
