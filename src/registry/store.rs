//! Connection registry implementation
//!
//! The central membership set of open connections and the broadcast
//! primitive that fans a frame out to all of them.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::connection::{ConnectionHandle, ConnectionId, OutboundReceiver};
use super::error::SendFailure;
use super::frame::RelayFrame;

/// Outcome of a single broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members the frame was enqueued for
    pub delivered: usize,
    /// Members that missed the frame because their queue was full
    pub dropped: usize,
    /// Members removed from the registry by this broadcast
    pub evicted: Vec<ConnectionId>,
}

/// Membership set of open relay connections
///
/// Thread-safe via `RwLock`. The lock is held only while the map is mutated
/// or iterated; broadcasting enqueues with `try_send` and never awaits a
/// socket write under the lock.
pub struct ConnectionRegistry {
    /// Registered connections keyed by id
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,

    /// Configuration
    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create a handle sized by this registry's outbound capacity
    pub fn channel(
        &self,
        id: ConnectionId,
        peer_addr: SocketAddr,
    ) -> (ConnectionHandle, OutboundReceiver) {
        ConnectionHandle::channel(id, peer_addr, self.config.outbound_capacity)
    }

    /// Add a connection to the membership set
    ///
    /// Returns the membership size after registration.
    pub async fn register(&self, handle: ConnectionHandle) -> usize {
        let mut connections = self.connections.write().await;
        let id = handle.id();
        let peer = handle.peer_addr();
        connections.insert(id, handle);

        tracing::debug!(
            conn = %id,
            peer = %peer,
            connections = connections.len(),
            "Connection registered"
        );

        connections.len()
    }

    /// Remove a connection
    ///
    /// Returns `false` without error if it was not registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();

        if removed {
            tracing::debug!(
                conn = %id,
                connections = connections.len(),
                "Connection unregistered"
            );
        }

        removed
    }

    /// Deliver a frame to every registered connection
    ///
    /// A failure on one member never stops delivery to the others. Members
    /// whose queue is closed, or that keep missing frames past
    /// `max_dropped_frames`, are removed once iteration is done.
    pub async fn broadcast(&self, frame: RelayFrame) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        {
            let connections = self.connections.read().await;

            for handle in connections.values() {
                if !self.config.echo_to_sender && frame.origin == Some(handle.id()) {
                    continue;
                }

                match handle.try_send(frame.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(SendFailure::Closed(id)) => {
                        tracing::warn!(conn = %id, "Send failed on closed connection, evicting");
                        report.evicted.push(id);
                    }
                    Err(SendFailure::Full(id)) => {
                        report.dropped += 1;
                        let dropped = handle.dropped_frames();
                        let limit = self.config.max_dropped_frames;

                        if limit > 0 && dropped >= limit {
                            tracing::warn!(
                                conn = %id,
                                dropped = dropped,
                                "Slow connection exceeded drop limit, evicting"
                            );
                            report.evicted.push(id);
                        } else {
                            tracing::debug!(conn = %id, dropped = dropped, "Outbound queue full, frame dropped");
                        }
                    }
                }
            }
        }

        if !report.evicted.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &report.evicted {
                connections.remove(id);
            }
        }

        report
    }

    /// Check whether a connection is registered
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Get the number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Drop every handle, closing all outbound queues
    ///
    /// Used at server teardown. Returns how many connections were closed.
    pub async fn close_all(&self) -> usize {
        let mut connections = self.connections.write().await;
        let count = connections.len();
        connections.clear();

        if count > 0 {
            tracing::info!(connections = count, "Closed all registered connections");
        }

        count
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn join(
        registry: &ConnectionRegistry,
        id: u64,
    ) -> (ConnectionId, OutboundReceiver) {
        let id = ConnectionId::new(id);
        let (handle, rx) = registry.channel(id, peer());
        registry.register(handle).await;
        (id, rx)
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let registry = ConnectionRegistry::new();
        let (_a, _rx_a) = join(&registry, 1).await;
        let before = registry.connection_count().await;

        let (b, _rx_b) = join(&registry, 2).await;
        assert_eq!(registry.connection_count().await, before + 1);

        assert!(registry.unregister(b).await);
        assert_eq!(registry.connection_count().await, before);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx) = join(&registry, 1).await;

        assert!(registry.unregister(a).await);
        assert!(!registry.unregister(a).await);
        assert!(!registry.unregister(ConnectionId::new(99)).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_includes_sender() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = join(&registry, 1).await;
        let (_b, mut rx_b) = join(&registry, 2).await;

        let report = registry
            .broadcast(RelayFrame::from_connection(a, r#"{"x":1,"y":2,"z":3}"#))
            .await;

        assert_eq!(report.delivered, 2);
        assert!(report.evicted.is_empty());
        assert_eq!(rx_a.recv().await.unwrap().as_str(), r#"{"x":1,"y":2,"z":3}"#);
        assert_eq!(rx_b.recv().await.unwrap().as_str(), r#"{"x":1,"y":2,"z":3}"#);
    }

    #[tokio::test]
    async fn test_broadcast_without_echo() {
        let registry = ConnectionRegistry::with_config(RegistryConfig::default().echo_to_sender(false));
        let (a, mut rx_a) = join(&registry, 1).await;
        let (_b, mut rx_b) = join(&registry, 2).await;

        let report = registry.broadcast(RelayFrame::from_connection(a, "{}")).await;

        assert_eq!(report.delivered, 1);
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_member_is_evicted() {
        let registry = ConnectionRegistry::new();
        let mut receivers = Vec::new();
        for id in 1..=5 {
            receivers.push(join(&registry, id).await);
        }

        // Member 3's task is gone
        let (dead, dead_rx) = receivers.remove(2);
        drop(dead_rx);

        let report = registry.broadcast(RelayFrame::unsourced("frame")).await;

        assert_eq!(report.delivered, 4);
        assert_eq!(report.evicted, vec![dead]);
        assert!(!registry.contains(dead).await);
        assert_eq!(registry.connection_count().await, 4);

        for (_, rx) in receivers.iter_mut() {
            assert_eq!(rx.recv().await.unwrap().as_str(), "frame");
        }
    }

    #[tokio::test]
    async fn test_slow_member_evicted_after_drop_limit() {
        let config = RegistryConfig::default()
            .outbound_capacity(1)
            .max_dropped_frames(2);
        let registry = ConnectionRegistry::with_config(config);
        let (slow, _slow_rx) = join(&registry, 1).await;

        // Fills the queue
        let report = registry.broadcast(RelayFrame::unsourced("1")).await;
        assert_eq!(report.delivered, 1);

        let report = registry.broadcast(RelayFrame::unsourced("2")).await;
        assert_eq!(report.dropped, 1);
        assert!(report.evicted.is_empty());

        let report = registry.broadcast(RelayFrame::unsourced("3")).await;
        assert_eq!(report.evicted, vec![slow]);
        assert!(!registry.contains(slow).await);
    }

    #[tokio::test]
    async fn test_full_queue_never_evicts_when_unlimited() {
        let config = RegistryConfig::default()
            .outbound_capacity(1)
            .max_dropped_frames(0);
        let registry = ConnectionRegistry::with_config(config);
        let (slow, _slow_rx) = join(&registry, 1).await;

        for _ in 0..10 {
            registry.broadcast(RelayFrame::unsourced("x")).await;
        }

        assert!(registry.contains(slow).await);
    }

    #[tokio::test]
    async fn test_per_member_order_is_preserved() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = join(&registry, 1).await;
        let (_b, mut rx_b) = join(&registry, 2).await;

        for n in 0..50 {
            registry
                .broadcast(RelayFrame::from_connection(a, n.to_string()))
                .await;
        }

        for n in 0..50 {
            assert_eq!(rx_b.recv().await.unwrap().as_str(), n.to_string());
        }
    }

    #[tokio::test]
    async fn test_close_all_closes_queues() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = join(&registry, 1).await;
        let (_b, mut rx_b) = join(&registry, 2).await;

        assert_eq!(registry.close_all().await, 2);
        assert_eq!(registry.connection_count().await, 0);
        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_membership_converges() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for n in 0..50u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let id = ConnectionId::new(n);
                let (handle, rx) = registry.channel(id, "127.0.0.1:1".parse().unwrap());
                registry.register(handle).await;
                registry.broadcast(RelayFrame::from_connection(id, "{}")).await;
                if n % 2 == 0 {
                    registry.unregister(id).await;
                    None
                } else {
                    Some(rx)
                }
            }));
        }

        let mut kept = Vec::new();
        for task in tasks {
            if let Some(rx) = task.await.unwrap() {
                kept.push(rx);
            }
        }

        assert_eq!(kept.len(), 25);
        assert_eq!(registry.connection_count().await, 25);
    }
}
