//! Registry-side handle for one relay connection

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::error::SendFailure;
use super::frame::RelayFrame;

/// Receiving end of a connection's outbound queue, drained by its task
pub type OutboundReceiver = mpsc::Receiver<RelayFrame>;

/// Opaque identity of an accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Send capability for one registered connection
///
/// Dropping the handle closes the outbound queue, which tells the owning
/// connection task to shut the socket.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer_addr: SocketAddr,
    tx: mpsc::Sender<RelayFrame>,
    /// Frames dropped in a row because the queue was full
    dropped: AtomicU64,
}

impl ConnectionHandle {
    /// Create a handle and the matching outbound receiver
    pub fn channel(
        id: ConnectionId,
        peer_addr: SocketAddr,
        capacity: usize,
    ) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id,
            peer_addr,
            tx,
            dropped: AtomicU64::new(0),
        };
        (handle, rx)
    }

    /// Connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether the owning task is still draining the queue
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Consecutive frames dropped on a full queue
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Enqueue a frame without waiting
    pub fn try_send(&self, frame: RelayFrame) -> Result<(), SendFailure> {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.dropped.store(0, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SendFailure::Full(self.id))
            }
            Err(TrySendError::Closed(_)) => Err(SendFailure::Closed(self.id)),
        }
    }
}
