//! Relay server
//!
//! One listening socket serves both WebSocket relay connections and the
//! plain-HTTP health response.

pub mod config;
pub(crate) mod connection;
pub(crate) mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;
