//! Haptic Timers - countdown timers with haptic feedback
//!
//! This is the main entry point for the haptic-timers application.

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

use haptic_timers::{
    api::ConfigServer,
    config::Config,
    engine::TimerEngine,
    services::{HostBindings, LoggingHost},
    state::{AppState, ConfigStore, KNOWN_HAPTICS},
    tasks::ConfigWatcher,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("haptic_timers={},tower_http=info", config.log_level()))
        .init();

    info!("Starting haptic-timers v{}", env!("CARGO_PKG_VERSION"));

    let data_dir = config.data_dir();
    info!("Configuration: data_dir={}, base_port={}", data_dir.display(), config.port);

    let store = Arc::new(ConfigStore::load_in(&data_dir));

    let _watcher = if config.no_watch {
        None
    } else {
        match ConfigWatcher::start(Arc::clone(&store)) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Failed to set up configuration watcher: {}", e);
                None
            }
        }
    };

    let host = Arc::new(LoggingHost);
    info!("Haptic events: {}", KNOWN_HAPTICS.join(", "));
    let _engine = TimerEngine::new(
        Arc::clone(&store),
        HostBindings::from_host(Arc::clone(&host)),
        Handle::current(),
    );

    let server = ConfigServer::start(AppState::new(Arc::clone(&store), host), config.port).await?;

    info!("Settings page: {}", server.url());
    info!("Endpoints:");
    info!("  GET  /api/config           - Current timer configuration");
    info!("  POST /api/config           - Replace timer configuration");
    info!("  POST /api/haptic-preview   - Play a haptic event");
    info!("  POST /api/restore-defaults - Add missing default timers");

    shutdown_signal().await;
    info!("Shutdown signal received");

    server.stop().await;
    info!("Server shutdown complete");
    Ok(())
}
