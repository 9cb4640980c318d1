//! Real-time relay for orientation readings
//!
//! A single long-lived server accepts WebSocket connections, parses every
//! inbound text frame as a [`Reading`], and rebroadcasts it to every
//! connected peer, the sender included.
//!
//! ```text
//!   [sensor] ──► RelayServer ──► ConnectionRegistry::broadcast()
//!                                  │          │          │
//!                                  ▼          ▼          ▼
//!                               [viewer]   [viewer]   [sensor]
//! ```
//!
//! The same listening socket answers plain HTTP requests with a fixed
//! health string so the process can be probed without a WebSocket client.

pub mod error;
pub mod reading;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use reading::{MalformedPayload, Reading};
pub use registry::{ConnectionId, ConnectionRegistry, RegistryConfig};
pub use server::{RelayServer, ServerConfig};
pub use stats::{RelayStats, ServerStats};
