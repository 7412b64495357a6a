//! Hot reload of the configuration file

use std::{ffi::OsString, sync::Arc, time::Duration};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tracing::{debug, error, info};

use crate::state::ConfigStore;

/// Quiet period that must pass after a change before reloading
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the store's backing file and reloads it after external edits
///
/// Dropping the watcher stops both the file notifications and the reload task.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching; must be called from within a tokio runtime
    pub fn start(store: Arc<ConfigStore>) -> Result<Self, notify::Error> {
        let path = store.path().to_path_buf();
        let dir = match path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let file_name: Option<OsString> = path.file_name().map(|name| name.to_os_string());
        let (tx, rx) = mpsc::channel(16);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let touches_config = event
                    .paths
                    .iter()
                    .any(|changed| changed.file_name().map(|name| name.to_os_string()) == file_name);
                if touches_config && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    // A full channel already has a reload pending
                    let _ = tx.try_send(());
                }
            }
            Err(e) => error!("Configuration watch error: {}", e),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        info!("Watching {} for changes", path.display());
        let task = tokio::spawn(reload_task(store, rx));

        Ok(Self { _watcher: watcher, task })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Background task that coalesces change bursts and reloads the store
async fn reload_task(store: Arc<ConfigStore>, mut changes: mpsc::Receiver<()>) {
    while changes.recv().await.is_some() {
        // Wait until the file has been quiet for the debounce period
        while let Ok(Some(())) = timeout(DEBOUNCE, changes.recv()).await {}

        debug!("Configuration file changed, reloading");
        let store = Arc::clone(&store);
        if let Err(e) = tokio::task::spawn_blocking(move || store.reload()).await {
            error!("Configuration reload task failed: {}", e);
        }
    }
}
