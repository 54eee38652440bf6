//! Event dispatcher
//!
//! Owns the single-writer serialization point per room: a handler takes
//! the room's mutex, applies the state transition, and emits every
//! outbound frame before releasing, so a state change and its broadcast
//! are indivisible from other changes in the same room. Different rooms
//! progress in parallel.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use watchparty_core::models::ConnectionId;
use watchparty_core::service::RoomRegistry;
use watchparty_core::{Config, Error};
use watchparty_sfu::SfuManager;

use super::hub::ConnectionHub;
use super::protocol::{ClientEvent, ClientFrame};

pub struct Dispatcher {
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) hub: Arc<ConnectionHub>,
    pub(crate) sfu: Arc<SfuManager>,
    pub(crate) config: Arc<Config>,
    pub(crate) http_client: reqwest::Client,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<RoomRegistry>,
        hub: Arc<ConnectionHub>,
        sfu: Arc<SfuManager>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            registry,
            hub,
            sfu,
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Route one inbound frame to its typed handler. Events other than
    /// `room:create` / `room:join` are dropped when the sender is not in
    /// a room.
    pub async fn dispatch(&self, conn: &ConnectionId, frame: ClientFrame) {
        let ack = frame.ack;
        match frame.event {
            ClientEvent::RoomCreate { user_name } => {
                self.on_room_create(conn, &user_name, ack).await;
            }
            ClientEvent::RoomJoin { room_id, user_name } => {
                self.on_room_join(conn, &room_id, &user_name, ack).await;
            }
            ClientEvent::RoomLeave => self.on_room_leave(conn).await,
            ClientEvent::RoomSetHidden { hidden } => self.on_room_set_hidden(conn, hidden).await,

            ClientEvent::VideoLoad { url } => self.on_video_load(conn, &url).await,
            ClientEvent::VideoPlay => self.on_video_play(conn).await,
            ClientEvent::VideoPause { current_time } => self.on_video_pause(conn, current_time).await,
            ClientEvent::VideoSeek { current_time } => self.on_video_seek(conn, current_time).await,
            ClientEvent::VideoRate { rate } => self.on_video_rate(conn, rate).await,
            ClientEvent::VideoEnded => self.on_video_ended(conn).await,

            ClientEvent::QueueAdd { url } => self.on_queue_add(conn, &url, ack).await,
            ClientEvent::QueueRemove { item_id } => self.on_queue_remove(conn, &item_id).await,
            ClientEvent::QueueReorder { item_id, index } => {
                self.on_queue_reorder(conn, &item_id, index).await;
            }
            ClientEvent::QueuePlay { item_id } => self.on_queue_play(conn, Some(&item_id)).await,
            ClientEvent::QueuePlayNext => self.on_queue_play(conn, None).await,

            ClientEvent::ChatSend { text } => self.on_chat_send(conn, &text).await,
            ClientEvent::ChatDelete { message_id } => self.on_chat_delete(conn, &message_id).await,

            ClientEvent::VoiceJoin => self.on_voice_join(conn, ack).await,
            ClientEvent::VoiceLeave => self.on_voice_leave(conn).await,
            ClientEvent::VoiceCreateSendTransport => {
                self.on_voice_create_transport(conn, true, ack).await;
            }
            ClientEvent::VoiceCreateRecvTransport => {
                self.on_voice_create_transport(conn, false, ack).await;
            }
            ClientEvent::VoiceConnectTransport {
                transport_id,
                dtls_parameters,
            } => {
                self.on_voice_connect_transport(conn, &transport_id, dtls_parameters, ack)
                    .await;
            }
            ClientEvent::VoiceProduce {
                kind,
                rtp_parameters,
            } => self.on_voice_produce(conn, kind, rtp_parameters, ack).await,
            ClientEvent::VoiceConsume {
                producer_id,
                rtp_capabilities,
            } => {
                self.on_voice_consume(conn, &producer_id, rtp_capabilities, ack)
                    .await;
            }
            ClientEvent::VoiceResumeConsumer { consumer_id } => {
                self.on_voice_resume_consumer(conn, &consumer_id, ack).await;
            }
            ClientEvent::VoicePauseProducer => self.on_voice_set_producer_paused(conn, true).await,
            ClientEvent::VoiceResumeProducer => {
                self.on_voice_set_producer_paused(conn, false).await;
            }

            ClientEvent::ScreenStart => self.on_screen_start(conn).await,
            ClientEvent::ScreenStop => self.on_screen_stop(conn).await,
            ClientEvent::ScreenOffer { to, payload } => {
                self.on_screen_relay(conn, &to, payload, ScreenRelay::Offer).await;
            }
            ClientEvent::ScreenAnswer { to, payload } => {
                self.on_screen_relay(conn, &to, payload, ScreenRelay::Answer).await;
            }
            ClientEvent::ScreenIceCandidate { to, payload } => {
                self.on_screen_relay(conn, &to, payload, ScreenRelay::IceCandidate)
                    .await;
            }
        }
    }

    /// Connection severed: voice teardown first, then room departure.
    pub async fn handle_disconnect(&self, conn: &ConnectionId) {
        debug!(%conn, "Running disconnect cleanup");
        self.leave_current_room(conn).await;
    }

    /// Surface an error as an ack field when the event carries one,
    /// otherwise as an `error` unicast.
    pub(crate) fn report(&self, conn: &ConnectionId, ack: Option<u64>, error: &Error) {
        match ack {
            Some(id) => self.hub.send_ack(
                conn,
                id,
                json!({ "success": false, "error": error.client_message() }),
            ),
            None => self.hub.send_error(conn, &error.client_message()),
        }
    }
}

/// Which screen-share signaling event is being relayed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ScreenRelay {
    Offer,
    Answer,
    IceCandidate,
}
