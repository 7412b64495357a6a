//! Loopback HTTP server lifecycle

use std::{net::Ipv4Addr, time::Duration};
use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, warn};

use super::create_router;
use crate::{error::TimerError, state::AppState};

/// Well-known first port tried by the settings server
pub const BASE_PORT: u16 = 34521;

/// Number of consecutive ports probed before falling back to the base port
pub const PORT_RANGE: u16 = 100;

/// Upper bound on waiting for in-flight requests during shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind to the first free loopback port at or after `base_port`
///
/// When every port in the range is taken the base port is tried once more and
/// its error returned.
pub async fn bind_first_available(base_port: u16, range: u16) -> std::io::Result<TcpListener> {
    for offset in 0..range {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => debug!("Port {} unavailable: {}", port, e),
        }
    }

    warn!("No free port in range starting at {}, falling back to it", base_port);
    TcpListener::bind((Ipv4Addr::LOCALHOST, base_port)).await
}

/// The running settings server
pub struct ConfigServer {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConfigServer {
    /// Bind a loopback port and start serving requests in the background
    pub async fn start(state: AppState, base_port: u16) -> Result<Self, TimerError> {
        let listener = bind_first_available(base_port, PORT_RANGE).await?;
        let port = listener.local_addr()?.port();
        let app = create_router(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                error!("Server error: {}", e);
            }
        });

        info!("Web configuration server started on http://localhost:{}", port);
        Ok(Self {
            port,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Port the server is listening on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address of the settings page
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Stop accepting connections and wait for in-flight requests
    ///
    /// Requests still running after [`SHUTDOWN_TIMEOUT`] are dropped.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(mut task) = self.task.take() {
            match timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(_) => info!("Web configuration server stopped"),
                Err(_) => {
                    warn!("Requests still running after {:?}, aborting server", SHUTDOWN_TIMEOUT);
                    task.abort();
                }
            }
        }
    }
}

impl Drop for ConfigServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
