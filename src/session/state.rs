//! Connection state machine
//!
//! Tracks one relay connection from upgrade to teardown:
//! `Connecting → Open → Closed`, terminal at `Closed`.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::ConnectionId;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Accepted, not yet registered
    Connecting,
    /// Registered; inbound frames are processed and broadcasts delivered
    Open,
    /// Unregistered (terminal)
    Closed,
}

/// Complete per-connection state
#[derive(Debug)]
pub struct SessionState {
    /// Connection id
    pub id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    phase: ConnectionPhase,

    /// Time the connection was accepted
    pub connected_at: Instant,

    /// Readings received and relayed from this connection
    pub readings_received: u64,

    /// Frames from this connection that failed to parse
    pub malformed_received: u64,

    /// Frames written to this connection
    pub frames_sent: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: ConnectionPhase::Connecting,
            connected_at: Instant::now(),
            readings_received: 0,
            malformed_received: 0,
            frames_sent: 0,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Transition `Connecting → Open`
    ///
    /// Returns `false` if the connection was not connecting.
    pub fn open(&mut self) -> bool {
        if self.phase == ConnectionPhase::Connecting {
            self.phase = ConnectionPhase::Open;
            true
        } else {
            false
        }
    }

    /// Transition to `Closed`
    ///
    /// Returns `true` only on the first call, so cleanup keyed on it runs
    /// exactly once.
    pub fn close(&mut self) -> bool {
        if self.phase == ConnectionPhase::Closed {
            false
        } else {
            self.phase = ConnectionPhase::Closed;
            true
        }
    }

    /// Check if the connection is open
    pub fn is_open(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }

    /// Get connection duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
