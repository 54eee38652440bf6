//! `chat:*` handlers: bounded room chat with hard delete

use tracing::debug;

use watchparty_core::models::{ChatMessage, ConnectionId};
use watchparty_core::{now_ms, Error};

use crate::ws::dispatcher::Dispatcher;
use crate::ws::protocol::ServerEvent;

impl Dispatcher {
    pub(crate) async fn on_chat_send(&self, conn: &ConnectionId, text: &str) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.report(
                conn,
                None,
                &Error::InvalidInput("Message cannot be empty".to_string()),
            );
            return;
        }
        let max_len = self.config.chat.max_message_len;
        if trimmed.chars().count() > max_len {
            self.report(
                conn,
                None,
                &Error::InvalidInput(format!("Message must be at most {max_len} characters")),
            );
            return;
        }

        let mut guard = room.lock().await;
        let Some(author) = guard.participants.get(conn) else {
            return;
        };
        let message = ChatMessage::user(author, trimmed.to_string(), now_ms());
        guard.push_chat(message.clone());

        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
        self.hub.send_to_many(&targets, &ServerEvent::Chat(message));
        drop(guard);
    }

    /// Hard delete by the author or the host.
    pub(crate) async fn on_chat_delete(&self, conn: &ConnectionId, message_id: &str) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;

        let Some(message) = guard.chat.iter().find(|m| m.id == message_id) else {
            debug!(message = message_id, "chat:delete for unknown message dropped");
            return;
        };
        if message.author_id != conn.as_str() && !guard.is_host(conn) {
            self.hub
                .send_error(conn, "Only the author or the host can delete a message");
            return;
        }

        guard.chat.retain(|m| m.id != message_id);
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
        self.hub.send_to_many(
            &targets,
            &ServerEvent::ChatDeleted {
                message_id: message_id.to_string(),
            },
        );
        drop(guard);
    }
}
