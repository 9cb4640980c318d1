//! Statistics and metrics for the relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live server-wide counters, shared by all connection tasks
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    readings_relayed: AtomicU64,
    malformed_payloads: AtomicU64,
    send_failures: AtomicU64,
}

impl RelayStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            readings_relayed: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
        }
    }

    /// Record an opened connection
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed connection
    pub fn connection_closed(&self) {
        // Never wraps below zero
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a relayed reading
    pub fn reading_relayed(&self) {
        self.readings_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped malformed payload
    pub fn malformed_payload(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record failed sends
    pub fn send_failures(&self, count: u64) {
        self.send_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            readings_relayed: self.readings_relayed.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total connections ever
    pub total_connections: u64,
    /// Current active connections
    pub active_connections: u64,
    /// Readings parsed and broadcast
    pub readings_relayed: u64,
    /// Frames dropped because they were not readings
    pub malformed_payloads: u64,
    /// Per-member sends that failed (dropped or evicted)
    pub send_failures: u64,
    /// Uptime
    pub uptime: Duration,
}

impl ServerStats {
    /// Readings relayed per second of uptime
    pub fn readings_per_sec(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.readings_relayed as f64 / secs
        } else {
            0.0
        }
    }
}
