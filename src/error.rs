//! Crate-level error types

use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by the relay server
#[derive(Error, Debug)]
pub enum Error {
    /// The listening socket could not be bound. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on the listener after startup
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport failure on a single connection (reset, protocol error)
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let err = Error::Bind {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };

        assert_eq!(
            err.to_string(),
            "failed to bind 127.0.0.1:8080: address in use"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: Error = io.into();

        assert!(matches!(err, Error::Io(_)));
    }
}
