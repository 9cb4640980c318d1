//! Registry error types

use thiserror::Error;

use super::connection::ConnectionId;

/// A broadcast could not be enqueued for one member
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The member's connection task is gone; the entry is stale
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
    /// The member's outbound queue is full; this frame is dropped for it
    #[error("outbound queue full for connection {0}")]
    Full(ConnectionId),
}

impl SendFailure {
    /// Connection the failure belongs to
    pub fn connection(&self) -> ConnectionId {
        match self {
            SendFailure::Closed(id) | SendFailure::Full(id) => *id,
        }
    }
}
