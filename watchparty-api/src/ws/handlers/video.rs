//! `video:*` handlers: the shared playback state machine

use tracing::info;

use watchparty_core::models::ConnectionId;
use watchparty_core::now_ms;
use watchparty_core::service::{playback, url, Transition};

use crate::ws::dispatcher::Dispatcher;
use crate::ws::protocol::ServerEvent;

impl Dispatcher {
    pub(crate) async fn on_video_load(&self, conn: &ConnectionId, raw_url: &str) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let source = match url::classify(raw_url) {
            Ok(source) => source,
            Err(e) => {
                self.report(conn, None, &e);
                return;
            }
        };

        let mut guard = room.lock().await;
        let now = now_ms();
        let snapshot = playback::load(&mut guard.video, &source, raw_url, now);
        let title = guard.current_title();
        let message = guard.push_system_message(format!("Now playing: {title}"), now);
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();

        self.hub
            .send_to_many(&targets, &ServerEvent::VideoLoad(snapshot));
        self.hub.send_to_many(&targets, &ServerEvent::Chat(message));
        drop(guard);

        info!(user = %conn, url = raw_url, "Video loaded");
    }

    pub(crate) async fn on_video_play(&self, conn: &ConnectionId) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        // Echo-suppressed transitions produce zero outbound events.
        if let Transition::Applied(snapshot) = playback::play(&mut guard.video, now_ms()) {
            let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
            self.hub
                .send_to_many(&targets, &ServerEvent::VideoStateUpdate(snapshot));
        }
        drop(guard);
    }

    pub(crate) async fn on_video_pause(&self, conn: &ConnectionId, current_time: f64) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        match playback::pause(&mut guard.video, current_time, now_ms()) {
            Ok(Transition::Applied(snapshot)) => {
                let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
                self.hub
                    .send_to_many(&targets, &ServerEvent::VideoStateUpdate(snapshot));
            }
            Ok(Transition::Suppressed) => {}
            Err(e) => self.report(conn, None, &e),
        }
        drop(guard);
    }

    pub(crate) async fn on_video_seek(&self, conn: &ConnectionId, current_time: f64) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        match playback::seek(&mut guard.video, current_time, now_ms()) {
            Ok(snapshot) => {
                let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
                self.hub
                    .send_to_many(&targets, &ServerEvent::VideoStateUpdate(snapshot));
            }
            Err(e) => self.report(conn, None, &e),
        }
        drop(guard);
    }

    pub(crate) async fn on_video_rate(&self, conn: &ConnectionId, rate: f64) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        match playback::set_rate(&mut guard.video, rate, now_ms()) {
            Ok(snapshot) => {
                let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
                self.hub
                    .send_to_many(&targets, &ServerEvent::VideoStateUpdate(snapshot));
            }
            Err(e) => self.report(conn, None, &e),
        }
        drop(guard);
    }

    /// End-of-video: advance the queue once per ended-lock window, no
    /// matter how many clients report completion.
    pub(crate) async fn on_video_ended(&self, conn: &ConnectionId) {
        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        let now = now_ms();
        if let Some((item, snapshot)) = playback::ended(&mut guard, now) {
            let message = guard.push_system_message(format!("Now playing: {}", item.title), now);
            let queue = guard.queue.clone();
            let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();

            self.hub
                .send_to_many(&targets, &ServerEvent::VideoLoad(snapshot));
            self.hub
                .send_to_many(&targets, &ServerEvent::QueueUpdate { queue });
            self.hub.send_to_many(&targets, &ServerEvent::Chat(message));
        }
        drop(guard);
    }
}
