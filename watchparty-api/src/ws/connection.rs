//! WebSocket connection lifecycle
//!
//! Each connection gets a stable ID at upgrade, a bounded outbound queue
//! drained by a writer task, and periodic pings. Socket close or a send
//! failure reports the disconnect to the dispatcher, which runs the
//! voice-teardown-then-leave sequence.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info};

use watchparty_core::models::ConnectionId;

use super::hub::OUTBOUND_QUEUE;
use super::protocol::ClientFrame;
use crate::http::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(20);

/// WebSocket handler for the event-stream protocol at `GET /ws`.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    // Signaling frames are small; cap well below the 64 MB default.
    ws.max_message_size(64 * 1024)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn = ConnectionId::new();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    state.hub.register(conn.clone(), tx.clone());

    info!(%conn, "WebSocket connection established");

    let (mut sink, mut stream) = socket.split();

    // Writer task: outbound queue -> socket
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    // Keepalive pings; the writer failing tears the connection down
    let ping_tx = tx.clone();
    let keepalive = tokio::spawn(async move {
        let mut ticker = interval(PING_INTERVAL);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            if ping_tx.send(Message::Ping(Vec::new())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => state.dispatcher.dispatch(&conn, frame).await,
                Err(e) => {
                    debug!(%conn, error = %e, "Dropping unknown or malformed event");
                }
            },
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(%conn, error = %e, "WebSocket read error");
                break;
            }
            Ok(_) => {} // binary/ping/pong ignored
        }
    }

    keepalive.abort();
    state.dispatcher.handle_disconnect(&conn).await;
    state.hub.unregister(&conn);
    writer.abort();

    info!(%conn, "WebSocket connection closed");
}
