//! Relay server listener
//!
//! Binds the listening socket and serves relay connections and health
//! requests until shutdown.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::registry::ConnectionRegistry;
use crate::server::config::ServerConfig;
use crate::server::handler::{self, RelayState};
use crate::stats::RelayStats;

/// Relay server
///
/// Owns the listening socket and the connection registry. The registry is
/// created at bind and closed when the server stops.
pub struct RelayServer {
    config: Arc<ServerConfig>,
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<RelayStats>,
}

impl RelayServer {
    /// Bind the listening socket
    ///
    /// Fails with [`Error::Bind`] if the address is unavailable.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let addr = config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let registry = Arc::new(ConnectionRegistry::with_config(config.registry.clone()));

        Ok(Self {
            config: Arc::new(config),
            listener,
            local_addr,
            registry,
            stats: Arc::new(RelayStats::new()),
        })
    }

    /// Bind on all interfaces at `port` with default settings
    pub async fn start(port: u16) -> Result<Self> {
        Self::bind(ServerConfig::default().port(port)).await
    }

    /// Get the bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get a reference to the live statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server
    ///
    /// This method runs until the process is terminated.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` resolves the listener stops accepting and every
    /// registered connection is closed.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            config,
            listener,
            local_addr,
            registry,
            stats,
        } = self;

        tracing::info!(addr = %local_addr, "Relay server listening");
        for addr in advertised_addrs(local_addr, interface_ips()) {
            tracing::info!(url = %format!("ws://{}", addr), "Accepting connections");
        }

        let stats_handle = spawn_stats_task(&config, &stats);

        let state = RelayState::new(Arc::clone(&config), Arc::clone(&registry), stats);
        let app = handler::router(state);

        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
        })
        .await;

        if let Some(handle) = stats_handle {
            handle.abort();
        }

        registry.close_all().await;

        result.map_err(Error::Io)
    }
}

/// Addresses clients can reach the server on
///
/// A wildcard bind expands to every external IPv4 interface address, or to
/// loopback when there is none. A specific bind is returned as is.
fn advertised_addrs<I>(local_addr: SocketAddr, interfaces: I) -> Vec<SocketAddr>
where
    I: IntoIterator<Item = IpAddr>,
{
    if !local_addr.ip().is_unspecified() {
        return vec![local_addr];
    }

    let port = local_addr.port();
    let mut addrs: Vec<SocketAddr> = interfaces
        .into_iter()
        .filter(|ip| ip.is_ipv4() && !ip.is_loopback())
        .map(|ip| SocketAddr::new(ip, port))
        .collect();
    addrs.dedup();

    if addrs.is_empty() {
        addrs.push(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }
    addrs
}

/// IP addresses of the host's network interfaces
fn interface_ips() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.iter().map(|iface| iface.ip()).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to list network interfaces");
            Vec::new()
        }
    }
}

/// Spawn the periodic stats logger, if enabled
fn spawn_stats_task(config: &ServerConfig, stats: &Arc<RelayStats>) -> Option<JoinHandle<()>> {
    if config.stats_interval.is_zero() {
        return None;
    }

    let stats = Arc::clone(stats);
    let interval = config.stats_interval;

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = stats.snapshot();
            tracing::info!(
                active = snapshot.active_connections,
                total = snapshot.total_connections,
                relayed = snapshot.readings_relayed,
                malformed = snapshot.malformed_payloads,
                send_failures = snapshot.send_failures,
                rate = snapshot.readings_per_sec(),
                uptime_secs = snapshot.uptime.as_secs(),
                "Relay stats"
            );
        }
    }))
}
