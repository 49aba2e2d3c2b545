//! Multi-port launcher.
//!
//! Starts one independent responder per port. A port that fails to bind is
//! logged and skipped; the rest keep serving. Listeners share nothing but the
//! shutdown signal.

use std::net::SocketAddr;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::http_api;

/// Outcome of starting a set of listeners.
pub struct Launch {
    started: Vec<SocketAddr>,
    failed: Vec<(u16, ServerError)>,
    tasks: JoinSet<()>,
}

impl Launch {
    /// Addresses that are now accepting connections.
    pub fn started(&self) -> &[SocketAddr] {
        &self.started
    }

    /// Ports that could not be bound, with the reason.
    pub fn failed(&self) -> &[(u16, ServerError)] {
        &self.failed
    }

    /// Wait for every listener to stop. Listeners stop once the shutdown
    /// signal passed to [`launch`] is set.
    pub async fn join(mut self) {
        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = res {
                tracing::warn!("listener task ended abnormally: {}", e);
            }
        }
    }
}

/// Bind each port in `ports` and spawn a serving task for every success.
pub async fn launch(
    config: &ServerConfig,
    ports: &[u16],
    shutdown: watch::Receiver<bool>,
) -> Launch {
    let mut launch = Launch {
        started: Vec::with_capacity(ports.len()),
        failed: Vec::new(),
        tasks: JoinSet::new(),
    };

    for &port in ports {
        let addr = config.addr(port);
        match http_api::bind(addr).await {
            Ok(listener) => {
                let bound = listener.local_addr().unwrap_or(addr);
                launch
                    .tasks
                    .spawn(http_api::serve(listener, config.clone(), shutdown.clone()));
                launch.started.push(bound);
            }
            Err(e) => {
                tracing::warn!("port {}: {}", port, e);
                launch.failed.push((port, e));
            }
        }
    }

    launch
}

/// Start every port in `ports` and serve until shutdown.
///
/// Fails only when no port at all could be bound.
pub async fn run_multiple(
    config: &ServerConfig,
    ports: &[u16],
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let launch = launch(config, ports, shutdown).await;

    if launch.started().is_empty() {
        return Err(ServerError::NothingStarted {
            attempted: ports.len(),
        });
    }

    tracing::info!(
        "{} of {} test servers running",
        launch.started().len(),
        ports.len()
    );

    launch.join().await;
    Ok(())
}
