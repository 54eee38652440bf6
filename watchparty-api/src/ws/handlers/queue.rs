//! `queue:*` handlers: bounded FIFO with reorder and direct play

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use watchparty_core::models::{ConnectionId, QueueItem, QUEUE_CAP};
use watchparty_core::service::{oembed, playback, url};
use watchparty_core::{now_ms, Error};

use crate::ws::dispatcher::Dispatcher;
use crate::ws::protocol::ServerEvent;

impl Dispatcher {
    pub(crate) async fn on_queue_add(&self, conn: &ConnectionId, raw_url: &str, ack: Option<u64>) {
        let Some(room) = self.registry.lookup(conn) else {
            self.report(conn, ack, &Error::NotFound("Not in a room".to_string()));
            return;
        };
        let source = match url::classify(raw_url) {
            Ok(source) => source,
            Err(e) => {
                self.report(conn, ack, &e);
                return;
            }
        };

        let mut guard = room.lock().await;
        if guard.queue.len() >= QUEUE_CAP {
            self.report(
                conn,
                ack,
                &Error::InvalidInput(format!("Queue is full ({QUEUE_CAP} items max)")),
            );
            return;
        }

        let now = now_ms();
        let (video_id, title) = match &source {
            url::VideoSource::Youtube { id } => (id.clone(), id.clone()),
            url::VideoSource::Direct => (String::new(), url::url_tail(raw_url)),
        };
        let added_by = guard
            .participants
            .get(conn)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let item = QueueItem::new(video_id, raw_url.to_string(), title, added_by.clone(), now);
        let item_id = item.id.clone();
        guard.queue.push(item);

        let message = guard.push_system_message(format!("{added_by} added a video to the queue"), now);
        let queue = guard.queue.clone();
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();

        if let Some(id) = ack {
            self.hub.send_ack(conn, id, json!({ "success": true }));
        }
        self.hub
            .send_to_many(&targets, &ServerEvent::QueueUpdate { queue });
        self.hub.send_to_many(&targets, &ServerEvent::Chat(message));
        drop(guard);

        // YouTube titles arrive best-effort from oEmbed; a follow-up
        // queue:update carries the real title when the lookup lands.
        if let url::VideoSource::Youtube { id } = source {
            let room = Arc::clone(&room);
            let hub = Arc::clone(&self.hub);
            let client = self.http_client.clone();
            tokio::spawn(async move {
                let title = match oembed::youtube_title(&client, &id).await {
                    Ok(title) => title,
                    Err(e) => {
                        debug!(video = %id, error = %e, "oEmbed title lookup failed");
                        return;
                    }
                };
                let mut guard = room.lock().await;
                let Some(item) = guard.queue.iter_mut().find(|i| i.id == item_id) else {
                    return; // already played or removed
                };
                item.title = title;
                let queue = guard.queue.clone();
                let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
                hub.send_to_many(&targets, &ServerEvent::QueueUpdate { queue });
            });
        }
    }

    pub(crate) async fn on_queue_remove(&self, conn: &ConnectionId, item_id: &str) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        let Some(index) = guard.queue.iter().position(|i| i.id == item_id) else {
            debug!(item = item_id, "queue:remove for unknown item dropped");
            return;
        };
        guard.queue.remove(index);

        let queue = guard.queue.clone();
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
        self.hub
            .send_to_many(&targets, &ServerEvent::QueueUpdate { queue });
        drop(guard);
    }

    pub(crate) async fn on_queue_reorder(&self, conn: &ConnectionId, item_id: &str, index: usize) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        let Some(from) = guard.queue.iter().position(|i| i.id == item_id) else {
            debug!(item = item_id, "queue:reorder for unknown item dropped");
            return;
        };
        let item = guard.queue.remove(from);
        let to = index.min(guard.queue.len());
        guard.queue.insert(to, item);

        let queue = guard.queue.clone();
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
        self.hub
            .send_to_many(&targets, &ServerEvent::QueueUpdate { queue });
        drop(guard);
    }

    /// Play a specific item (`queue:play`) or the head (`queue:play-next`),
    /// removing it from the queue and loading it as the current video.
    pub(crate) async fn on_queue_play(&self, conn: &ConnectionId, item_id: Option<&str>) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        let index = match item_id {
            Some(id) => match guard.queue.iter().position(|i| i.id == id) {
                Some(index) => index,
                None => {
                    debug!(item = id, "queue:play for unknown item dropped");
                    return;
                }
            },
            None => {
                if guard.queue.is_empty() {
                    self.hub.send_error(conn, "Queue is empty");
                    return;
                }
                0
            }
        };

        let item = guard.queue.remove(index);
        let now = now_ms();
        let source = if item.video_id.is_empty() {
            url::VideoSource::Direct
        } else {
            url::VideoSource::Youtube {
                id: item.video_id.clone(),
            }
        };
        let snapshot = playback::load(&mut guard.video, &source, &item.video_url, now);
        let message = guard.push_system_message(format!("Now playing: {}", item.title), now);
        let queue = guard.queue.clone();
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();

        self.hub
            .send_to_many(&targets, &ServerEvent::VideoLoad(snapshot));
        self.hub
            .send_to_many(&targets, &ServerEvent::QueueUpdate { queue });
        self.hub.send_to_many(&targets, &ServerEvent::Chat(message));
        drop(guard);
    }
}
