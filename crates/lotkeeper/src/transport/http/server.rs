//! HTTP server: bind, serve until a shutdown trigger, report what was left parked.

use std::fmt;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tracing::info;

use crate::service::ParkingService;

use super::routes::routes;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// If true, ignore SIGTERM and wait for explicit /shutdown or SIGINT.
    pub await_explicit_shutdown: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            await_explicit_shutdown: false,
        }
    }
}

impl ServerConfig {
    /// Listen address. `host` must be an IP literal (v4 or v6).
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.host.trim_matches(['[', ']']).parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// What ended the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Requested => "/shutdown",
        })
    }
}

/// Serve the lot over HTTP until SIGINT, SIGTERM or `POST /shutdown`.
pub async fn serve(
    config: ServerConfig,
    service: Arc<ParkingService>,
) -> anyhow::Result<ShutdownReason> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "lotkeeper listening");

    let (reason_tx, reason_rx) = oneshot::channel();
    let trigger = wait_for_shutdown(config.await_explicit_shutdown, service.shutdown_rx());

    axum::serve(listener, routes(Arc::clone(&service)))
        .with_graceful_shutdown(async move {
            let reason = trigger.await;
            info!(%reason, "Draining connections");
            let _ = reason_tx.send(reason);
        })
        .await?;

    let reason = reason_rx
        .await
        .map_err(|_| anyhow::anyhow!("server stopped without a shutdown trigger"))?;
    log_remaining(&service);
    Ok(reason)
}

/// One line per category with vehicles still inside.
fn log_remaining(service: &ParkingService) {
    let lots = service.health().lots;
    let total: u32 = lots.iter().map(|lot| lot.occupied).sum();
    for lot in lots.iter().filter(|lot| lot.occupied > 0) {
        info!(
            category = %lot.category,
            occupied = lot.occupied,
            capacity = lot.capacity,
            "Vehicles still parked at shutdown"
        );
    }
    info!(still_parked = total, "Server shutdown complete");
}

async fn wait_for_shutdown(
    await_explicit_shutdown: bool,
    shutdown_rx: watch::Receiver<bool>,
) -> ShutdownReason {
    tokio::select! {
        () = interrupt() => ShutdownReason::Interrupt,
        () = terminate(await_explicit_shutdown) => ShutdownReason::Terminate,
        () = requested(shutdown_rx) => ShutdownReason::Requested,
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate(await_explicit_shutdown: bool) {
    use tokio::signal::unix::{SignalKind, signal};

    if await_explicit_shutdown {
        info!("await_explicit_shutdown enabled, ignoring SIGTERM");
        return std::future::pending().await;
    }
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate(_await_explicit_shutdown: bool) {
    std::future::pending().await
}

/// Resolves once the flag is set. A dropped sender never resolves.
async fn requested(mut shutdown_rx: watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
