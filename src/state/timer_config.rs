//! Timer definitions and the persisted configuration document

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Haptic name that disables feedback for a timer
pub const HAPTIC_NONE: &str = "none";

/// Haptic events the host device knows how to play
pub const KNOWN_HAPTICS: [&str; 3] = ["jingle", "knock", "ringing"];

fn default_haptic() -> String {
    "jingle".to_string()
}

fn default_active() -> bool {
    true
}

/// A single named countdown timer
///
/// Field names are persisted in PascalCase exactly as the settings UI sends
/// them (`Id`, `Name`, `Hours`, ..., `IsActive`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimerDefinition {
    /// Stable identifier, assigned once when the timer is created
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
    /// Name of the haptic event raised when the countdown elapses
    #[serde(default = "default_haptic")]
    pub haptic: String,
    /// Whether the timer is offered to the host as an action parameter
    #[serde(rename = "IsActive", default = "default_active")]
    pub active: bool,
}

impl TimerDefinition {
    /// Create an active timer with the default haptic
    pub fn new(id: impl Into<String>, name: impl Into<String>, hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hours,
            minutes,
            seconds,
            haptic: default_haptic(),
            active: true,
        }
    }

    /// Use a different haptic event
    pub fn with_haptic(mut self, haptic: impl Into<String>) -> Self {
        self.haptic = haptic.into();
        self
    }

    /// Total duration in seconds
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// Total duration in milliseconds
    pub fn total_milliseconds(&self) -> u64 {
        self.total_seconds() * 1000
    }

    /// A timer can only be started when it lasts at least one second
    pub fn is_runnable(&self) -> bool {
        self.total_seconds() > 0
    }

    /// Configured duration as `HH:MM:SS`
    pub fn display_time(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }

    /// Label used when registering the timer as an action parameter
    pub fn parameter_label(&self) -> String {
        format!("{} ({})", self.name, self.display_time())
    }

    /// The haptic to raise on completion, if any
    pub fn haptic_event(&self) -> Option<&str> {
        let haptic = self.haptic.trim();
        if haptic.is_empty() || haptic.eq_ignore_ascii_case(HAPTIC_NONE) {
            None
        } else {
            Some(haptic)
        }
    }
}

/// Ordered list of timers, in the order the settings UI displays them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimerConfiguration {
    #[serde(default)]
    pub timers: Vec<TimerDefinition>,
}

impl TimerConfiguration {
    pub fn new(timers: Vec<TimerDefinition>) -> Self {
        Self { timers }
    }

    /// The four presets offered on a fresh install
    pub fn defaults() -> Self {
        Self::new(vec![
            TimerDefinition::new("default-5min", "Quick Break", 0, 5, 0).with_haptic("jingle"),
            TimerDefinition::new("default-15min", "Short Session", 0, 15, 0).with_haptic("knock"),
            TimerDefinition::new("default-30min", "Work Session", 0, 30, 0).with_haptic("ringing"),
            TimerDefinition::new("default-1hour", "Long Session", 1, 0, 0).with_haptic("jingle"),
        ])
    }

    /// Find a timer by id
    pub fn get(&self, id: &str) -> Option<&TimerDefinition> {
        self.timers.iter().find(|timer| timer.id == id)
    }

    /// Iterate over the timers exposed to the host
    pub fn active(&self) -> impl Iterator<Item = &TimerDefinition> {
        self.timers.iter().filter(|timer| timer.active)
    }

    /// First id that appears more than once, if any
    pub fn duplicate_id(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.timers
            .iter()
            .find(|timer| !seen.insert(timer.id.as_str()))
            .map(|timer| timer.id.as_str())
    }

    /// Append every default preset whose id is missing; returns how many were added
    pub fn merge_defaults(&mut self) -> usize {
        let missing: Vec<TimerDefinition> = Self::defaults()
            .timers
            .into_iter()
            .filter(|preset| self.get(&preset.id).is_none())
            .collect();
        let added = missing.len();
        self.timers.extend(missing);
        added
    }
}
