//! `screen:*` handlers: single-sharer coordination and blind relay

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use watchparty_core::models::ConnectionId;

use crate::ws::dispatcher::{Dispatcher, ScreenRelay};
use crate::ws::protocol::ServerEvent;

impl Dispatcher {
    pub(crate) async fn on_screen_start(&self, conn: &ConnectionId) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;

        if let Some(sharer) = &guard.screen_sharer {
            if sharer != conn {
                self.hub
                    .send_error(conn, "Another participant is already sharing");
                return;
            }
        }
        guard.screen_sharer = Some(conn.clone());

        let others: Vec<ConnectionId> = guard
            .participants
            .keys()
            .filter(|c| *c != conn)
            .cloned()
            .collect();

        self.hub.send_to_many(
            &others,
            &ServerEvent::ScreenStarted {
                sharer_id: conn.as_str().to_string(),
            },
        );
        // Fanout kickoff: the sharer opens one peer connection per
        // existing member.
        for viewer in &others {
            self.hub.send(
                conn,
                &ServerEvent::ScreenViewerJoined {
                    viewer_id: viewer.as_str().to_string(),
                },
            );
        }
        drop(guard);

        info!(user = %conn, "Screen share started");
    }

    pub(crate) async fn on_screen_stop(&self, conn: &ConnectionId) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        if guard.screen_sharer.as_ref() != Some(conn) {
            return;
        }
        guard.screen_sharer = None;

        let others: Vec<ConnectionId> = guard
            .participants
            .keys()
            .filter(|c| *c != conn)
            .cloned()
            .collect();
        self.hub.send_to_many(&others, &ServerEvent::ScreenStopped);
        drop(guard);

        info!(user = %conn, "Screen share stopped");
    }

    /// Forward offer/answer/ICE to `to` with `from` rewritten to the
    /// sender. The payload itself is never inspected.
    pub(crate) async fn on_screen_relay(
        &self,
        conn: &ConnectionId,
        to: &str,
        mut payload: Map<String, Value>,
        relay: ScreenRelay,
    ) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let target = ConnectionId::from(to);
        {
            // Relays stay inside the sender's room.
            let guard = room.lock().await;
            if !guard.participants.contains_key(&target) {
                debug!(%conn, to, "Screen relay to non-member dropped");
                return;
            }
        }

        payload.insert("from".to_string(), json!(conn.as_str()));
        let data = Value::Object(payload);
        let event = match relay {
            ScreenRelay::Offer => ServerEvent::ScreenOffer(data),
            ScreenRelay::Answer => ServerEvent::ScreenAnswer(data),
            ScreenRelay::IceCandidate => ServerEvent::ScreenIceCandidate(data),
        };
        self.hub.send(&target, &event);
    }
}
