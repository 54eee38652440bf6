//! `room:*` handlers: create, join, leave, lobby visibility

use serde_json::json;
use tracing::info;

use watchparty_core::models::ConnectionId;
use watchparty_core::{now_ms, Error};

use crate::ws::dispatcher::Dispatcher;
use crate::ws::protocol::{RoomStateSnapshot, ServerEvent};

impl Dispatcher {
    pub(crate) async fn on_room_create(
        &self,
        conn: &ConnectionId,
        user_name: &str,
        ack: Option<u64>,
    ) {
        if self.registry.code_of(conn).is_some() {
            // One room per connection; leave the old one first.
            self.leave_current_room(conn).await;
        }

        let created = self.registry.create(conn.clone(), user_name).await;
        let guard = created.room.lock().await;
        let snapshot = RoomStateSnapshot::from_room(&guard, now_ms());

        if let Some(id) = ack {
            self.hub.send_ack(
                conn,
                id,
                json!({ "roomId": created.code, "userId": conn.as_str() }),
            );
        }
        self.hub.send(conn, &ServerEvent::RoomState(snapshot));
        drop(guard);

        info!(room = %created.code, user = %created.host.name, "Room created by connection");
    }

    pub(crate) async fn on_room_join(
        &self,
        conn: &ConnectionId,
        room_id: &str,
        user_name: &str,
        ack: Option<u64>,
    ) {
        if self.registry.code_of(conn).is_some() {
            self.leave_current_room(conn).await;
        }

        let joined = match self.registry.join(room_id, conn.clone(), user_name).await {
            Ok(joined) => joined,
            Err(e) => {
                self.report(conn, ack, &e);
                return;
            }
        };

        let mut guard = joined.room.lock().await;
        let now = now_ms();
        let message =
            guard.push_system_message(format!("{} joined the room", joined.participant.name), now);
        let snapshot = RoomStateSnapshot::from_room(&guard, now);
        let others: Vec<ConnectionId> = guard
            .participants
            .keys()
            .filter(|c| *c != conn)
            .cloned()
            .collect();
        let sharer = guard.screen_sharer.clone();

        if let Some(id) = ack {
            self.hub
                .send_ack(conn, id, json!({ "success": true, "userId": conn.as_str() }));
        }
        self.hub.send(conn, &ServerEvent::RoomState(snapshot));
        self.hub.send_to_many(
            &others,
            &ServerEvent::RoomUserJoined {
                user: joined.participant.info(),
            },
        );
        self.hub.send_to_many(&others, &ServerEvent::Chat(message));

        // An active share fans out to the newcomer through the sharer.
        if let Some(sharer) = sharer {
            self.hub.send(
                &sharer,
                &ServerEvent::ScreenViewerJoined {
                    viewer_id: conn.as_str().to_string(),
                },
            );
        }
        drop(guard);
    }

    pub(crate) async fn on_room_leave(&self, conn: &ConnectionId) {
        self.leave_current_room(conn).await;
    }

    /// Host-only lobby visibility toggle.
    pub(crate) async fn on_room_set_hidden(&self, conn: &ConnectionId, hidden: bool) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        if !guard.is_host(conn) {
            self.hub
                .send_error(conn, "Only the host can change room visibility");
            return;
        }
        if guard.is_hidden == hidden {
            return;
        }
        guard.is_hidden = hidden;
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
        self.hub
            .send_to_many(&targets, &ServerEvent::RoomHiddenChanged { is_hidden: hidden });
        drop(guard);
    }

    /// Shared leave sequence for `room:leave` and disconnects: SFU
    /// teardown first (producer close drives the `voice:producer-closed`
    /// fanout), then room departure with host transfer.
    pub(crate) async fn leave_current_room(&self, conn: &ConnectionId) {
        let Some(code) = self.registry.code_of(conn) else {
            return;
        };

        let closed = self.sfu.remove_peer(&code, conn.as_str()).await;

        let Some(outcome) = self.registry.leave(conn).await else {
            return;
        };

        let Some(room) = outcome.room else {
            // Last participant: the room and its code are gone.
            return;
        };

        let mut guard = room.lock().await;
        let now = now_ms();
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();

        if outcome.was_in_voice {
            self.hub.send_to_many(
                &targets,
                &ServerEvent::VoiceUserLeft {
                    connection_id: conn.as_str().to_string(),
                },
            );
        }
        if let Some(producer_id) = closed.and_then(|c| c.producer_id) {
            self.hub.send_to_many(
                &targets,
                &ServerEvent::VoiceProducerClosed {
                    connection_id: conn.as_str().to_string(),
                    producer_id,
                },
            );
        }
        if outcome.was_sharer {
            self.hub.send_to_many(&targets, &ServerEvent::ScreenStopped);
        }

        let message =
            guard.push_system_message(format!("{} left the room", outcome.departed.name), now);
        self.hub.send_to_many(
            &targets,
            &ServerEvent::RoomUserLeft {
                user_id: conn.as_str().to_string(),
                user_name: outcome.departed.name.clone(),
            },
        );
        self.hub.send_to_many(&targets, &ServerEvent::Chat(message));

        if let Some(new_host) = &outcome.new_host {
            let host_name = guard
                .participants
                .get(new_host)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let message = guard.push_system_message(format!("{host_name} is now the host"), now);
            self.hub.send_to_many(
                &targets,
                &ServerEvent::RoomHostChanged {
                    host_id: new_host.as_str().to_string(),
                },
            );
            self.hub.send_to_many(&targets, &ServerEvent::Chat(message));
        }
        drop(guard);
    }

    /// Helper shared by handlers that need the caller's room or report
    /// the miss through the given ack.
    pub(crate) fn require_room_code(
        &self,
        conn: &ConnectionId,
        ack: Option<u64>,
    ) -> Option<String> {
        match self.registry.code_of(conn) {
            Some(code) => Some(code),
            None => {
                if ack.is_some() {
                    self.report(conn, ack, &Error::NotFound("Not in a room".to_string()));
                }
                None
            }
        }
    }
}
