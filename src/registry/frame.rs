//! Broadcast frame type
//!
//! A frame carries one encoded reading to every member of the registry.

use std::sync::Arc;

use super::connection::ConnectionId;

/// An encoded reading ready to be written to subscribers
///
/// Cheap to clone: all members share the same payload allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    /// Connection that published the reading, if any
    pub origin: Option<ConnectionId>,
    /// JSON text of the reading
    pub payload: Arc<str>,
}

impl RelayFrame {
    /// Create a frame published by `origin`
    pub fn from_connection(origin: ConnectionId, payload: impl Into<Arc<str>>) -> Self {
        Self {
            origin: Some(origin),
            payload: payload.into(),
        }
    }

    /// Create a frame with no originating connection
    pub fn unsourced(payload: impl Into<Arc<str>>) -> Self {
        Self {
            origin: None,
            payload: payload.into(),
        }
    }

    /// Payload as text
    pub fn as_str(&self) -> &str {
        &self.payload
    }
}
