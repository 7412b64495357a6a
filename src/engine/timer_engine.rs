//! Countdown state machine driven by button presses

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    runtime::Handle,
    sync::oneshot,
    time::{interval_at, sleep_until, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use super::display::{format_remaining, label, NOT_FOUND_LABEL, NOT_SET_LABEL};
use crate::{
    error::TimerError,
    services::HostBindings,
    state::{ConfigStore, RunningTimerState, SubscriptionId, TimerConfiguration, TimerDefinition, TimerPhase},
};

/// Group under which timers are offered to the host
pub const PARAMETER_GROUP: &str = "Timers";

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What a trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started { timer_id: String, total_ms: u64 },
    Cancelled { timer_id: String },
}

#[derive(Default)]
struct Countdown {
    state: Option<RunningTimerState>,
    /// Definition captured when the countdown started
    definition: Option<TimerDefinition>,
    /// Bumped on every start so stale countdown tasks can tell they lost
    generation: u64,
    /// Dropping the sender stops the countdown task
    cancel: Option<oneshot::Sender<()>>,
}

/// Runs one countdown at a time for the timers in a [`ConfigStore`]
///
/// A trigger starts the named timer, or cancels the countdown in progress.
/// Completion is driven by its own deadline; the one-second tick only
/// resamples the remaining time for display.
pub struct TimerEngine {
    store: Arc<ConfigStore>,
    host: HostBindings,
    runtime: Handle,
    countdown: Mutex<Countdown>,
    /// Registered action parameters, id to label
    parameters: Mutex<BTreeMap<String, String>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl TimerEngine {
    /// Create an engine, register the active timers with the host and follow
    /// configuration changes
    pub fn new(store: Arc<ConfigStore>, host: HostBindings, runtime: Handle) -> Arc<Self> {
        let engine = Arc::new(Self {
            store: Arc::clone(&store),
            host,
            runtime,
            countdown: Mutex::new(Countdown::default()),
            parameters: Mutex::new(BTreeMap::new()),
            subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&engine);
        let id = store.subscribe(move |config| {
            if let Some(engine) = weak.upgrade() {
                engine.on_configuration_changed(config);
            }
            Ok(())
        });
        *engine.subscription.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);

        engine.sync_parameters(&store.get());
        engine
    }

    /// Handle a button press for `timer_id`
    ///
    /// Starts the timer when nothing is running. While a countdown runs, any
    /// trigger cancels it instead of starting a second one.
    pub fn trigger(self: &Arc<Self>, timer_id: &str) -> Result<TriggerOutcome, TimerError> {
        let mut guard = self.lock_countdown();
        let countdown = &mut *guard;

        if let Some(state) = countdown.state.as_mut().filter(|state| state.is_running()) {
            state.finish(TimerPhase::Cancelled);
            let cancelled = state.timer_id.clone();
            let generation = countdown.generation;
            countdown.cancel = None;
            drop(guard);

            if cancelled == timer_id {
                info!("Timer stopped: {}", cancelled);
            } else {
                info!("Trigger for {} stopped running timer {}", timer_id, cancelled);
            }
            self.host.display.on_image_changed(Some(&cancelled));
            self.settle(generation);
            return Ok(TriggerOutcome::Cancelled { timer_id: cancelled });
        }

        let Some(timer) = self.store.get_timer(timer_id) else {
            let e = TimerError::TimerNotFound(timer_id.to_string());
            error!("{}", e);
            return Err(e);
        };

        if !timer.is_runnable() {
            let e = TimerError::TimerNotRunnable { id: timer.id };
            warn!("{}", e);
            return Err(e);
        }

        let state = RunningTimerState::start(&timer.id, timer.total_milliseconds());
        let total_ms = state.total_ms;
        let deadline = state.deadline();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        countdown.generation += 1;
        countdown.state = Some(state);
        countdown.definition = Some(timer.clone());
        countdown.cancel = Some(cancel_tx);
        self.runtime
            .spawn(Arc::clone(self).run_countdown(countdown.generation, deadline, cancel_rx));
        drop(guard);

        info!("Starting timer: {} ({})", timer.name, timer.display_time());
        self.host.display.on_image_changed(Some(&timer.id));
        Ok(TriggerOutcome::Started { timer_id: timer.id, total_ms })
    }

    /// Current phase
    ///
    /// `Elapsed` and `Cancelled` only last until the host has been asked to
    /// redraw the finished timer, after which the engine is `Idle` again.
    pub fn phase(&self) -> TimerPhase {
        self.lock_countdown()
            .state
            .as_ref()
            .map_or(TimerPhase::Idle, |state| state.phase)
    }

    /// Copy of the current countdown state
    pub fn snapshot(&self) -> Option<RunningTimerState> {
        self.lock_countdown().state.clone()
    }

    /// Button label for a bound timer
    ///
    /// Shows the remaining time while that timer counts down and the
    /// configured duration otherwise.
    pub fn display_text(&self, action_parameter: Option<&str>) -> String {
        let Some(id) = action_parameter.filter(|id| !id.is_empty()) else {
            return NOT_SET_LABEL.to_string();
        };
        let Some(timer) = self.store.get_timer(id) else {
            return NOT_FOUND_LABEL.to_string();
        };

        let countdown = self.lock_countdown();
        match countdown
            .state
            .as_ref()
            .filter(|state| state.is_running() && state.timer_id == id && state.remaining_ms > 0)
        {
            Some(state) => label(&timer.name, &format_remaining(state.remaining_ms)),
            None => label(&timer.name, &timer.display_time()),
        }
    }

    /// Ids currently registered with the host, in id order
    pub fn registered_parameters(&self) -> Vec<String> {
        self.lock_parameters().keys().cloned().collect()
    }

    fn on_configuration_changed(&self, config: &TimerConfiguration) {
        debug!("Configuration changed, rescanning {} timer(s)", config.timers.len());
        self.sync_parameters(config);
        self.host.display.on_image_changed(None);
    }

    /// Register active timers, re-register renamed ones and drop the rest.
    /// A running countdown is left alone.
    fn sync_parameters(&self, config: &TimerConfiguration) {
        let mut registered = self.lock_parameters();
        let mut active = HashSet::new();

        for timer in config.active() {
            active.insert(timer.id.as_str());
            let display_name = timer.parameter_label();

            match registered.get(&timer.id) {
                None => {
                    self.host.parameters.add_parameter(&timer.id, &display_name, PARAMETER_GROUP);
                    info!("Added timer parameter: {} - {}", timer.id, display_name);
                }
                Some(existing) if *existing != display_name => {
                    self.host.parameters.remove_parameter(&timer.id);
                    self.host.parameters.add_parameter(&timer.id, &display_name, PARAMETER_GROUP);
                    info!("Updated timer parameter: {} - {}", timer.id, display_name);
                }
                Some(_) => continue,
            }
            registered.insert(timer.id.clone(), display_name);
        }

        let stale: Vec<String> = registered
            .keys()
            .filter(|id| !active.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.host.parameters.remove_parameter(&id);
            registered.remove(&id);
            info!("Removed timer parameter: {}", id);
        }
    }

    async fn run_countdown(self: Arc<Self>, generation: u64, deadline: Instant, mut cancel: oneshot::Receiver<()>) {
        let completion = sleep_until(deadline);
        tokio::pin!(completion);

        let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticking = true;

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel => {
                    debug!("Countdown {} cancelled", generation);
                    return;
                }

                _ = &mut completion => {
                    self.complete(generation);
                    return;
                }

                _ = ticker.tick(), if ticking => {
                    ticking = self.tick(generation);
                }
            }
        }
    }

    /// Refresh the remaining time; returns false once ticking should stop
    fn tick(&self, generation: u64) -> bool {
        let mut countdown = self.lock_countdown();
        if countdown.generation != generation {
            return false;
        }
        let Some(state) = countdown.state.as_mut().filter(|state| state.is_running()) else {
            return false;
        };

        let remaining = state.refresh_remaining();
        let timer_id = state.timer_id.clone();
        if remaining == 0 {
            debug!("Countdown for {} reached zero on tick", timer_id);
            state.finish(TimerPhase::Elapsed);
        }
        drop(countdown);

        self.host.display.on_image_changed(Some(&timer_id));
        remaining > 0
    }

    fn complete(&self, generation: u64) {
        let mut guard = self.lock_countdown();
        let countdown = &mut *guard;
        if countdown.generation != generation {
            return;
        }
        match countdown.state.as_mut() {
            Some(state) if state.phase != TimerPhase::Cancelled => state.finish(TimerPhase::Elapsed),
            _ => return,
        }
        countdown.cancel = None;
        let definition = countdown.definition.clone();
        drop(guard);

        if let Some(timer) = definition {
            info!("Timer elapsed: {}", timer.name);
            match timer.haptic_event() {
                Some(haptic) => self.host.haptics.raise_event(haptic),
                None => debug!("Timer {} has no haptic", timer.id),
            }
        }
        self.host.display.on_image_changed(None);
        self.settle(generation);
    }

    /// Move a finished countdown back to `Idle` unless a newer one started
    fn settle(&self, generation: u64) {
        let mut countdown = self.lock_countdown();
        if countdown.generation != generation {
            return;
        }
        if let Some(state) = countdown.state.as_mut() {
            state.settle();
        }
    }

    fn lock_countdown(&self) -> MutexGuard<'_, Countdown> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_parameters(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.parameters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        let subscription = self.subscription.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(id) = subscription {
            self.store.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{DisplayRefresh, HapticSink, ParameterRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::time::sleep;

    #[derive(Default)]
    struct RecordingHost {
        haptics: Mutex<Vec<String>>,
        refreshes: AtomicUsize,
        added: Mutex<Vec<(String, String)>>,
        removed: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn haptics(&self) -> Vec<String> {
            self.haptics.lock().unwrap().clone()
        }

        fn added(&self) -> Vec<(String, String)> {
            self.added.lock().unwrap().clone()
        }

        fn removed(&self) -> Vec<String> {
            self.removed.lock().unwrap().clone()
        }
    }

    impl HapticSink for RecordingHost {
        fn raise_event(&self, name: &str) {
            self.haptics.lock().unwrap().push(name.to_string());
        }
    }

    impl DisplayRefresh for RecordingHost {
        fn on_image_changed(&self, _action_parameter: Option<&str>) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ParameterRegistry for RecordingHost {
        fn add_parameter(&self, id: &str, display_name: &str, _group: &str) {
            self.added.lock().unwrap().push((id.to_string(), display_name.to_string()));
        }

        fn remove_parameter(&self, id: &str) {
            self.removed.lock().unwrap().push(id.to_string());
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<ConfigStore>,
        host: Arc<RecordingHost>,
        engine: Arc<TimerEngine>,
    }

    fn fixture(timers: Vec<TimerDefinition>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ConfigStore::load_in(dir.path()));
        store.update(TimerConfiguration::new(timers));
        let host = Arc::new(RecordingHost::default());
        let engine = TimerEngine::new(
            Arc::clone(&store),
            HostBindings::from_host(Arc::clone(&host)),
            Handle::current(),
        );
        Fixture { _dir: dir, store, host, engine }
    }

    fn tea() -> TimerDefinition {
        TimerDefinition::new("tea", "Tea", 0, 0, 3).with_haptic("knock")
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_elapses_once_and_raises_haptic() {
        let f = fixture(vec![tea()]);

        let outcome = f.engine.trigger("tea").unwrap();
        assert_eq!(outcome, TriggerOutcome::Started { timer_id: "tea".into(), total_ms: 3_000 });
        assert_eq!(f.engine.phase(), TimerPhase::Running);
        assert_eq!(f.engine.display_text(Some("tea")), "Tea\n00:03");

        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(f.engine.phase(), TimerPhase::Running);
        assert_eq!(f.engine.display_text(Some("tea")), "Tea\n00:01");
        assert!(f.host.haptics().is_empty());

        sleep(Duration::from_secs(5)).await;
        assert_eq!(f.engine.phase(), TimerPhase::Idle);
        assert_eq!(f.host.haptics(), ["knock"]);
        assert_eq!(f.engine.snapshot().unwrap().remaining_ms, 0);
        assert_eq!(f.engine.display_text(Some("tea")), "Tea\n00:00:03");
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_cancels_without_haptic() {
        let f = fixture(vec![tea()]);

        f.engine.trigger("tea").unwrap();
        sleep(Duration::from_secs(1)).await;
        let outcome = f.engine.trigger("tea").unwrap();

        assert_eq!(outcome, TriggerOutcome::Cancelled { timer_id: "tea".into() });
        assert_eq!(f.engine.phase(), TimerPhase::Idle);
        assert_eq!(f.engine.snapshot().unwrap().remaining_ms, 0);

        sleep(Duration::from_secs(10)).await;
        assert!(f.host.haptics().is_empty());
        assert_eq!(f.engine.phase(), TimerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_countdowns_return_to_idle() {
        let f = fixture(vec![tea()]);
        assert_eq!(f.engine.phase(), TimerPhase::Idle);

        f.engine.trigger("tea").unwrap();
        f.engine.trigger("tea").unwrap();
        assert_eq!(f.engine.phase(), TimerPhase::Idle);
        let refreshes_after_cancel = f.host.refreshes.load(Ordering::SeqCst);
        assert!(refreshes_after_cancel >= 2);

        f.engine.trigger("tea").unwrap();
        assert_eq!(f.engine.phase(), TimerPhase::Running);
        sleep(Duration::from_secs(4)).await;

        assert_eq!(f.engine.phase(), TimerPhase::Idle);
        assert!(f.host.refreshes.load(Ordering::SeqCst) > refreshes_after_cancel);
        assert_eq!(f.host.haptics(), ["knock"]);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_for_other_timer_cancels_the_running_one() {
        let f = fixture(vec![tea(), TimerDefinition::new("nap", "Nap", 0, 20, 0)]);

        f.engine.trigger("tea").unwrap();
        let outcome = f.engine.trigger("nap").unwrap();

        assert_eq!(outcome, TriggerOutcome::Cancelled { timer_id: "tea".into() });
        sleep(Duration::from_secs(5)).await;
        assert!(f.host.haptics().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_timer_can_run_again() {
        let f = fixture(vec![tea()]);

        f.engine.trigger("tea").unwrap();
        sleep(Duration::from_secs(4)).await;
        assert_eq!(f.engine.phase(), TimerPhase::Idle);

        assert!(matches!(f.engine.trigger("tea"), Ok(TriggerOutcome::Started { .. })));
        sleep(Duration::from_secs(4)).await;
        assert_eq!(f.host.haptics(), ["knock", "knock"]);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_timer_elapses_without_haptic() {
        let f = fixture(vec![TimerDefinition::new("quiet", "Quiet", 0, 0, 2).with_haptic("none")]);

        f.engine.trigger("quiet").unwrap();
        sleep(Duration::from_secs(3)).await;

        assert_eq!(f.engine.phase(), TimerPhase::Idle);
        assert!(f.host.haptics().is_empty());
        assert!(f.host.refreshes.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn zero_duration_timer_is_not_started() {
        let f = fixture(vec![TimerDefinition::new("zero", "Zero", 0, 0, 0)]);

        let result = f.engine.trigger("zero");

        assert!(matches!(result, Err(TimerError::TimerNotRunnable { ref id }) if id == "zero"));
        assert_eq!(f.engine.phase(), TimerPhase::Idle);
        assert!(f.engine.snapshot().is_none());
    }

    #[tokio::test]
    async fn unknown_timer_is_ignored() {
        let f = fixture(vec![tea()]);

        assert!(matches!(f.engine.trigger("ghost"), Err(TimerError::TimerNotFound(_))));
        assert_eq!(f.engine.phase(), TimerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn labels_for_unbound_missing_and_long_timers() {
        let f = fixture(vec![TimerDefinition::new("long", "Long", 1, 30, 0)]);

        assert_eq!(f.engine.display_text(None), NOT_SET_LABEL);
        assert_eq!(f.engine.display_text(Some("")), NOT_SET_LABEL);
        assert_eq!(f.engine.display_text(Some("ghost")), NOT_FOUND_LABEL);
        assert_eq!(f.engine.display_text(Some("long")), "Long\n01:30:00");

        f.engine.trigger("long").unwrap();
        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(f.engine.display_text(Some("long")), "Long\n1:29:59");
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_changes_resync_parameters_without_stopping_countdown() {
        let mut inactive = TimerDefinition::new("off", "Off", 0, 1, 0);
        inactive.active = false;
        let f = fixture(vec![tea(), TimerDefinition::new("nap", "Nap", 0, 20, 0), inactive]);

        assert_eq!(f.engine.registered_parameters(), ["nap", "tea"]);
        assert!(f.host.added().contains(&("tea".to_string(), "Tea (00:00:03)".to_string())));

        f.engine.trigger("tea").unwrap();

        let mut renamed = f.store.get().timers[1].clone();
        renamed.name = "Siesta".to_string();
        let mut switched_on = f.store.get().timers[2].clone();
        switched_on.active = true;
        f.store.update(TimerConfiguration::new(vec![tea(), renamed, switched_on]));

        assert_eq!(f.engine.registered_parameters(), ["nap", "off", "tea"]);
        assert!(f.host.added().contains(&("nap".to_string(), "Siesta (00:20:00)".to_string())));
        assert_eq!(f.host.removed(), ["nap"]);
        assert_eq!(f.engine.phase(), TimerPhase::Running);

        f.store.update(TimerConfiguration::new(vec![tea()]));
        assert_eq!(f.engine.registered_parameters(), ["tea"]);
        assert_eq!(f.engine.phase(), TimerPhase::Running);

        sleep(Duration::from_secs(4)).await;
        assert_eq!(f.host.haptics(), ["knock"]);
    }
}
