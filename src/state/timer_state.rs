//! Countdown state for a running timer

use std::time::Duration;
use tokio::time::Instant;

/// Where a countdown is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Elapsed,
    Cancelled,
}

/// Transient state of the countdown an engine is running
#[derive(Debug, Clone)]
pub struct RunningTimerState {
    pub timer_id: String,
    pub started_at: Instant,
    pub total_ms: u64,
    pub remaining_ms: u64,
    pub phase: TimerPhase,
}

impl RunningTimerState {
    /// Start counting down from `total_ms` now
    pub fn start(timer_id: impl Into<String>, total_ms: u64) -> Self {
        Self {
            timer_id: timer_id.into(),
            started_at: Instant::now(),
            total_ms,
            remaining_ms: total_ms,
            phase: TimerPhase::Running,
        }
    }

    /// Monotonic instant at which the countdown completes
    pub fn deadline(&self) -> Instant {
        self.started_at + Duration::from_millis(self.total_ms)
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Resample the remaining time from the clock
    pub fn refresh_remaining(&mut self) -> u64 {
        let elapsed = self.started_at.elapsed().as_millis();
        self.remaining_ms = u64::try_from(u128::from(self.total_ms).saturating_sub(elapsed)).unwrap_or(0);
        self.remaining_ms
    }

    /// Stop the countdown with the given terminal phase
    pub fn finish(&mut self, phase: TimerPhase) {
        self.remaining_ms = 0;
        self.phase = phase;
    }

    /// Return a finished countdown to `Idle` once its final state was shown
    pub fn settle(&mut self) {
        if matches!(self.phase, TimerPhase::Elapsed | TimerPhase::Cancelled) {
            self.phase = TimerPhase::Idle;
        }
    }
}
