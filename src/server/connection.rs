//! Per-connection relay task
//!
//! One task owns each upgraded socket. It reads inbound frames, relays the
//! ones that parse as readings, and drains the connection's outbound queue
//! onto the socket. Registration happens on entry and unregistration exactly
//! once on exit, however the connection ends.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};

use crate::error::Result;
use crate::reading::{MalformedPayload, Reading};
use crate::registry::{ConnectionRegistry, OutboundReceiver, RelayFrame};
use crate::server::handler::RelayState;
use crate::session::SessionState;
use crate::stats::RelayStats;

/// Why a connection loop ended without a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Peer sent a close frame
    ClientClosed,
    /// Inbound stream ended without a close frame
    StreamEnded,
    /// Outbound queue closed by the registry (eviction or shutdown)
    Evicted,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client closed"),
            CloseReason::StreamEnded => write!(f, "stream ended"),
            CloseReason::Evicted => write!(f, "closed by server"),
        }
    }
}

/// Run a relay connection to completion
pub(crate) async fn serve(socket: WebSocket, peer_addr: SocketAddr, ctx: RelayState) {
    let id = ctx.next_connection_id();
    let mut state = SessionState::new(id, peer_addr);
    let (handle, outbound) = ctx.registry.channel(id, peer_addr);

    let connections = ctx.registry.register(handle).await;
    state.open();
    ctx.stats.connection_opened();

    tracing::info!(
        conn = %id,
        peer = %peer_addr,
        connections = connections,
        "Client connected"
    );

    let mut connection = Connection {
        state,
        socket,
        outbound,
        registry: Arc::clone(&ctx.registry),
        stats: Arc::clone(&ctx.stats),
        max_reading_size: ctx.config.max_reading_size,
    };

    let result = connection.run().await;
    connection.finish(result).await;
}

struct Connection {
    state: SessionState,
    socket: WebSocket,
    outbound: OutboundReceiver,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<RelayStats>,
    max_reading_size: usize,
}

impl Connection {
    async fn run(&mut self) -> Result<CloseReason> {
        loop {
            tokio::select! {
                inbound = self.socket.recv() => match inbound {
                    Some(Ok(message)) => {
                        if let Some(reason) = self.handle_message(message).await {
                            return Ok(reason);
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(CloseReason::StreamEnded),
                },
                outbound = self.outbound.recv() => match outbound {
                    Some(frame) => {
                        self.socket.send(Message::Text(frame.as_str().into())).await?;
                        self.state.frames_sent += 1;
                    }
                    None => {
                        let _ = self.socket.send(Message::Close(None)).await;
                        return Ok(CloseReason::Evicted);
                    }
                },
            }
        }
    }

    /// Returns a close reason when the message ends the connection
    async fn handle_message(&mut self, message: Message) -> Option<CloseReason> {
        match message {
            Message::Text(text) => {
                let parsed = Reading::from_frame(text.as_str().as_bytes(), self.max_reading_size);
                self.relay(parsed).await;
                None
            }
            Message::Binary(bytes) => {
                let parsed = Reading::from_frame(&bytes, self.max_reading_size);
                self.relay(parsed).await;
                None
            }
            // Pongs are answered by the transport
            Message::Ping(_) | Message::Pong(_) => None,
            Message::Close(_) => Some(CloseReason::ClientClosed),
        }
    }

    async fn relay(&mut self, parsed: std::result::Result<Reading, MalformedPayload>) {
        let id = self.state.id;

        let reading = match parsed {
            Ok(reading) => reading,
            Err(e) => {
                self.state.malformed_received += 1;
                self.stats.malformed_payload();
                tracing::warn!(
                    conn = %id,
                    error = %e,
                    raw = %e.raw(),
                    "Dropping malformed payload"
                );
                return;
            }
        };

        let payload = match reading.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(conn = %id, error = %e, "Failed to encode reading");
                return;
            }
        };

        tracing::debug!(
            conn = %id,
            x = %reading.x,
            y = %reading.y,
            z = %reading.z,
            "Sensor reading"
        );

        self.state.readings_received += 1;
        self.stats.reading_relayed();

        let report = self
            .registry
            .broadcast(RelayFrame::from_connection(id, payload))
            .await;

        let failures = report.dropped + report.evicted.len();
        if failures > 0 {
            self.stats.send_failures(failures as u64);
        }
    }

    /// Unregister and log the disconnect
    ///
    /// Consumes the connection, so this runs once per connection.
    async fn finish(mut self, result: Result<CloseReason>) {
        self.state.close();

        let id = self.state.id;
        self.stats.connection_closed();
        self.registry.unregister(id).await;

        let duration_ms = self.state.duration().as_millis() as u64;

        match result {
            Ok(reason) => tracing::info!(
                conn = %id,
                peer = %self.state.peer_addr,
                reason = %reason,
                duration_ms = duration_ms,
                readings = self.state.readings_received,
                malformed = self.state.malformed_received,
                sent = self.state.frames_sent,
                "Client disconnected"
            ),
            Err(e) => tracing::info!(
                conn = %id,
                peer = %self.state.peer_addr,
                error = %e,
                duration_ms = duration_ms,
                readings = self.state.readings_received,
                malformed = self.state.malformed_received,
                sent = self.state.frames_sent,
                "Client disconnected"
            ),
        }
    }
}
