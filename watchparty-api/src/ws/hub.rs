//! Connection hub
//!
//! Tracks live connections and their outbound queues. Every send goes
//! through a bounded per-connection channel with `try_send`: a slow
//! subscriber gets frames dropped rather than delaying the room.

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use watchparty_core::models::ConnectionId;

use super::protocol::ServerEvent;

/// Outbound queue depth per connection
pub const OUTBOUND_QUEUE: usize = 256;

pub struct ConnectionHub {
    connections: DashMap<ConnectionId, mpsc::Sender<Message>>,
}

impl ConnectionHub {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn register(&self, conn: ConnectionId, tx: mpsc::Sender<Message>) {
        self.connections.insert(conn, tx);
    }

    pub fn unregister(&self, conn: &ConnectionId) {
        self.connections.remove(conn);
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn push(&self, conn: &ConnectionId, text: String) {
        let Some(tx) = self.connections.get(conn) else {
            debug!(%conn, "Send to unknown connection dropped");
            return;
        };
        match tx.try_send(Message::Text(text)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%conn, "Outbound queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(%conn, "Outbound queue closed (disconnected)");
            }
        }
    }

    /// Fire-and-forget unicast.
    pub fn send(&self, conn: &ConnectionId, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(text) => self.push(conn, text),
            Err(e) => warn!(error = %e, "Failed to serialize server event"),
        }
    }

    /// Unicast to every target, serializing once.
    pub fn send_to_many<'a, I>(&self, targets: I, event: &ServerEvent)
    where
        I: IntoIterator<Item = &'a ConnectionId>,
    {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize server event");
                return;
            }
        };
        for conn in targets {
            self.push(conn, text.clone());
        }
    }

    /// Answer an inbound frame's ack exactly once.
    pub fn send_ack(&self, conn: &ConnectionId, ack: u64, data: Value) {
        let frame = json!({ "event": "ack", "ack": ack, "data": data });
        match serde_json::to_string(&frame) {
            Ok(text) => self.push(conn, text),
            Err(e) => warn!(error = %e, "Failed to serialize ack frame"),
        }
    }

    /// Unicast `error {message}`.
    pub fn send_error(&self, conn: &ConnectionId, message: &str) {
        self.send(
            conn,
            &ServerEvent::Error {
                message: message.to_string(),
            },
        );
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}
