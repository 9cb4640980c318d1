//! HTTP entry point
//!
//! Every request lands on one fallback handler. WebSocket upgrades become
//! relay connections; anything else is answered with the health text so the
//! port can be probed without a WebSocket client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::server::config::ServerConfig;
use crate::server::connection;
use crate::stats::RelayStats;

/// State shared by every request and connection task
#[derive(Clone)]
pub(crate) struct RelayState {
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) stats: Arc<RelayStats>,
    next_connection_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayState {
    pub(crate) fn new(
        config: Arc<ServerConfig>,
        registry: Arc<ConnectionRegistry>,
        stats: Arc<RelayStats>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            stats,
            next_connection_id: Arc::new(AtomicU64::new(1)),
            connection_semaphore,
        }
    }

    /// Allocate the next connection id
    pub(crate) fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Reserve a connection slot
    ///
    /// `Ok(None)` when connections are unlimited, `Err(())` when the limit
    /// is reached.
    fn try_reserve(&self) -> Result<Option<OwnedSemaphorePermit>, ()> {
        match self.connection_semaphore {
            Some(ref sem) => sem.clone().try_acquire_owned().map(Some).map_err(|_| ()),
            None => Ok(None),
        }
    }
}

/// Build the router serving both the relay and the health text
pub(crate) fn router(state: RelayState) -> Router {
    Router::new().fallback(relay_entry).with_state(state)
}

async fn relay_entry(
    State(state): State<RelayState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(_) => return health(&state.config.health_text),
    };

    let permit = match state.try_reserve() {
        Ok(permit) => permit,
        Err(()) => {
            tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    let max_message_size = state.config.max_message_size;

    upgrade
        .max_message_size(max_message_size)
        .on_failed_upgrade(move |error| {
            tracing::debug!(peer = %peer_addr, error = %error, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            connection::serve(socket, peer_addr, state).await;
        })
}

fn health(text: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        text.to_owned(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max_connections: usize) -> RelayState {
        let config = ServerConfig::default().max_connections(max_connections);
        RelayState::new(
            Arc::new(config),
            Arc::new(ConnectionRegistry::new()),
            Arc::new(RelayStats::new()),
        )
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let state = state(0);
        let a = state.next_connection_id();
        let b = state.clone().next_connection_id();

        assert_eq!(a, ConnectionId::new(1));
        assert_eq!(b, ConnectionId::new(2));
    }

    #[test]
    fn test_unlimited_connections() {
        let state = state(0);

        for _ in 0..100 {
            assert!(matches!(state.try_reserve(), Ok(None)));
        }
    }

    #[test]
    fn test_connection_limit() {
        let state = state(2);

        let first = state.try_reserve().unwrap();
        let _second = state.try_reserve().unwrap();
        assert!(state.try_reserve().is_err());

        drop(first);
        assert!(state.try_reserve().is_ok());
    }

    #[test]
    fn test_health_response() {
        let response = health("Sensor Data WebSocket Server\n");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }
}
