//! Persistent timer configuration with change notifications

use std::{
    fs,
    panic::{catch_unwind, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};
use tracing::{debug, error, info, warn};

use super::{TimerConfiguration, TimerDefinition};
use crate::error::TimerError;

/// File name of the configuration document inside the data directory
pub const CONFIG_FILE_NAME: &str = "timer-config.json";

/// Callback invoked after the configuration changed
pub type ConfigListener = dyn Fn(&TimerConfiguration) -> anyhow::Result<()> + Send + Sync;

/// Handle returned by [`ConfigStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Arc<ConfigListener>)>,
}

/// State guarded by the writer lock
#[derive(Default)]
struct WriterState {
    /// Bytes of the last document this store wrote, used to recognise its own
    /// writes when the file watcher reports them back
    last_persisted: Option<Vec<u8>>,
}

/// Owner of the timer configuration
///
/// Readers get an immutable snapshot that is swapped wholesale on every
/// change. Writers (`update`, `restore_defaults` and watcher reloads) are
/// serialized through a single mutex, and each successful change notifies
/// every subscriber in registration order.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<TimerConfiguration>>,
    writer: Mutex<WriterState>,
    subscribers: Mutex<Subscribers>,
}

impl ConfigStore {
    /// Load the configuration from `path`
    ///
    /// A missing file yields the default presets without writing them. A
    /// file that cannot be read or parsed is logged and also replaced by the
    /// defaults in memory; the file itself is left untouched.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = if path.exists() {
            match read_configuration(&path) {
                Ok(config) => {
                    info!("Loaded {} timer(s) from {}", config.timers.len(), path.display());
                    config
                }
                Err(e) => {
                    error!("{}", e);
                    TimerConfiguration::defaults()
                }
            }
        } else {
            info!("No configuration at {}, using default timers", path.display());
            TimerConfiguration::defaults()
        };

        Self {
            path,
            current: RwLock::new(Arc::new(config)),
            writer: Mutex::new(WriterState::default()),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    /// Load `timer-config.json` from a data directory
    pub fn load_in(data_dir: impl AsRef<Path>) -> Self {
        Self::load(data_dir.as_ref().join(CONFIG_FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current configuration snapshot
    pub fn get(&self) -> Arc<TimerConfiguration> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Look up a single timer by id
    pub fn get_timer(&self, id: &str) -> Option<TimerDefinition> {
        self.get().get(id).cloned()
    }

    /// Replace the configuration, persist it and notify subscribers
    ///
    /// The new configuration is applied in memory before it is written. A
    /// failed write is logged and not rolled back; subscribers are only
    /// notified once the file was written.
    pub fn update(&self, config: TimerConfiguration) {
        let mut writer = self.lock_writer();
        self.commit(&mut writer, config);
    }

    /// Add every default preset that is missing, keeping user timers as they are
    ///
    /// Returns the number of presets added. Nothing is written when all
    /// presets are already present.
    pub fn restore_defaults(&self) -> usize {
        let mut writer = self.lock_writer();
        let mut config = (*self.get()).clone();
        let added = config.merge_defaults();

        if added == 0 {
            info!("All default timers already present");
        } else {
            info!("Restoring {} default timer(s)", added);
            self.commit(&mut writer, config);
        }
        added
    }

    /// Re-read the backing file after an external change
    ///
    /// Never writes. Returns true when a new configuration was applied.
    pub fn reload(&self) -> bool {
        let mut writer = self.lock_writer();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Ignoring change to {}: {}", self.path.display(), e);
                return false;
            }
        };

        if writer.last_persisted.as_deref() == Some(bytes.as_slice()) {
            debug!("Configuration file change matches our last write, skipping reload");
            return false;
        }

        let config = match parse_configuration(&self.path, &bytes) {
            Ok(config) => config,
            Err(e) => {
                error!("{}; keeping current configuration", e);
                return false;
            }
        };

        info!("Reloaded {} timer(s) from {}", config.timers.len(), self.path.display());
        self.replace(config);
        // The file no longer holds our last write, so that content counts as
        // an external change if it comes back
        writer.last_persisted = None;
        self.notify();
        drop(writer);
        true
    }

    /// Register a listener for configuration changes
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TimerConfiguration) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, config: TimerConfiguration) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(config);
    }

    fn commit(&self, writer: &mut WriterState, config: TimerConfiguration) {
        let count = config.timers.len();
        self.replace(config);
        let snapshot = self.get();

        match self.persist(&snapshot) {
            Ok(bytes) => {
                info!("Saved {} timer(s) to {}", count, self.path.display());
                writer.last_persisted = Some(bytes);
                self.notify();
            }
            Err(e) => error!("{}", e),
        }
    }

    fn persist(&self, config: &TimerConfiguration) -> Result<Vec<u8>, TimerError> {
        let bytes = serde_json::to_vec_pretty(config).map_err(|e| TimerError::save(&self.path, e))?;

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| TimerError::save(&self.path, e))?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, &bytes).map_err(|e| TimerError::save(&self.path, e))?;
        fs::rename(&staging, &self.path).map_err(|e| TimerError::save(&self.path, e))?;
        Ok(bytes)
    }

    fn notify(&self) {
        let listeners: Vec<Arc<ConfigListener>> = {
            let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            subscribers.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };
        let snapshot = self.get();

        debug!("Notifying {} configuration listener(s)", listeners.len());
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Configuration listener failed: {:#}", e),
                Err(_) => error!("Configuration listener panicked"),
            }
        }
    }
}

fn read_configuration(path: &Path) -> Result<TimerConfiguration, TimerError> {
    let bytes = fs::read(path).map_err(|e| TimerError::load(path, e))?;
    parse_configuration(path, &bytes)
}

fn parse_configuration(path: &Path, bytes: &[u8]) -> Result<TimerConfiguration, TimerError> {
    serde_json::from_slice(bytes).map_err(|e| TimerError::load(path, e))
}
