//! Connection registry for broadcast fan-out
//!
//! The registry tracks every open relay connection and delivers each
//! relayed reading to all of them.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<ConnectionRegistry>
//!                 ┌───────────────────────────────┐
//!                 │ connections: HashMap<Id,      │
//!                 │   ConnectionHandle {          │
//!                 │     tx: mpsc::Sender,         │
//!                 │   }                           │
//!                 │ >                             │
//!                 └───────────────┬───────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Connection]            [Connection]            [Connection]
//!    socket.recv()           outbound.recv()         outbound.recv()
//!         │                       │                       │
//!         └──► registry.broadcast()──► socket.send() ──► TCP
//! ```
//!
//! # Delivery
//!
//! `broadcast` never writes to a socket. It enqueues the frame on each
//! member's bounded outbound queue with `try_send` while holding the read
//! lock, so a slow peer can never stall the sender or the other members.
//! Each queue is FIFO, which keeps per-subscriber order equal to broadcast
//! order. A member whose queue is closed is evicted after the iteration.

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod store;

pub use config::RegistryConfig;
pub use connection::{ConnectionHandle, ConnectionId, OutboundReceiver};
pub use error::SendFailure;
pub use frame::RelayFrame;
pub use store::{BroadcastReport, ConnectionRegistry};
