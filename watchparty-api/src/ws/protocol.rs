//! Wire protocol
//!
//! JSON text frames over the WebSocket. Inbound frames are
//! `{event, data, ack?}`; the event name selects the typed payload and
//! `ack` is a client-chosen integer the server answers exactly once with
//! an `{event: "ack", ack, data}` frame. Outbound events are
//! `{event, data}`. Unknown event names fail deserialization and are
//! dropped with a log.

use mediasoup::prelude::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use watchparty_core::models::{
    ChatMessage, ParticipantInfo, QueueItem, Room, VideoSnapshot,
};

/// One inbound frame: a typed event plus an optional ack id.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    #[serde(flatten)]
    pub event: ClientEvent,
    #[serde(default)]
    pub ack: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:create", rename_all = "camelCase")]
    RoomCreate {
        #[serde(default)]
        user_name: String,
    },
    #[serde(rename = "room:join", rename_all = "camelCase")]
    RoomJoin {
        room_id: String,
        #[serde(default)]
        user_name: String,
    },
    #[serde(rename = "room:leave")]
    RoomLeave,
    #[serde(rename = "room:set-hidden")]
    RoomSetHidden { hidden: bool },

    #[serde(rename = "video:load")]
    VideoLoad { url: String },
    #[serde(rename = "video:play")]
    VideoPlay,
    #[serde(rename = "video:pause", rename_all = "camelCase")]
    VideoPause { current_time: f64 },
    #[serde(rename = "video:seek", rename_all = "camelCase")]
    VideoSeek { current_time: f64 },
    #[serde(rename = "video:rate")]
    VideoRate { rate: f64 },
    #[serde(rename = "video:ended")]
    VideoEnded,

    #[serde(rename = "queue:add")]
    QueueAdd { url: String },
    #[serde(rename = "queue:remove", rename_all = "camelCase")]
    QueueRemove { item_id: String },
    #[serde(rename = "queue:reorder", rename_all = "camelCase")]
    QueueReorder { item_id: String, index: usize },
    #[serde(rename = "queue:play", rename_all = "camelCase")]
    QueuePlay { item_id: String },
    #[serde(rename = "queue:play-next")]
    QueuePlayNext,

    #[serde(rename = "chat:message")]
    ChatSend { text: String },
    #[serde(rename = "chat:delete", rename_all = "camelCase")]
    ChatDelete { message_id: String },

    #[serde(rename = "voice:join")]
    VoiceJoin,
    #[serde(rename = "voice:leave")]
    VoiceLeave,
    #[serde(rename = "voice:create-send-transport")]
    VoiceCreateSendTransport,
    #[serde(rename = "voice:create-recv-transport")]
    VoiceCreateRecvTransport,
    #[serde(rename = "voice:connect-transport", rename_all = "camelCase")]
    VoiceConnectTransport {
        transport_id: String,
        dtls_parameters: DtlsParameters,
    },
    #[serde(rename = "voice:produce", rename_all = "camelCase")]
    VoiceProduce {
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },
    #[serde(rename = "voice:consume", rename_all = "camelCase")]
    VoiceConsume {
        producer_id: String,
        rtp_capabilities: RtpCapabilities,
    },
    #[serde(rename = "voice:resume-consumer", rename_all = "camelCase")]
    VoiceResumeConsumer { consumer_id: String },
    #[serde(rename = "voice:pause-producer")]
    VoicePauseProducer,
    #[serde(rename = "voice:resume-producer")]
    VoiceResumeProducer,

    #[serde(rename = "screen:start")]
    ScreenStart,
    #[serde(rename = "screen:stop")]
    ScreenStop,
    #[serde(rename = "screen:offer")]
    ScreenOffer {
        to: String,
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    #[serde(rename = "screen:answer")]
    ScreenAnswer {
        to: String,
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    #[serde(rename = "screen:ice-candidate")]
    ScreenIceCandidate {
        to: String,
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "room:state")]
    RoomState(RoomStateSnapshot),
    #[serde(rename = "room:user-joined")]
    RoomUserJoined { user: ParticipantInfo },
    #[serde(rename = "room:user-left", rename_all = "camelCase")]
    RoomUserLeft { user_id: String, user_name: String },
    #[serde(rename = "room:host-changed", rename_all = "camelCase")]
    RoomHostChanged { host_id: String },
    #[serde(rename = "room:hidden-changed", rename_all = "camelCase")]
    RoomHiddenChanged { is_hidden: bool },

    #[serde(rename = "video:load")]
    VideoLoad(VideoSnapshot),
    #[serde(rename = "video:state-update")]
    VideoStateUpdate(VideoSnapshot),
    #[serde(rename = "video:heartbeat")]
    VideoHeartbeat(VideoSnapshot),

    #[serde(rename = "queue:update")]
    QueueUpdate { queue: Vec<QueueItem> },

    #[serde(rename = "chat:message")]
    Chat(ChatMessage),
    #[serde(rename = "chat:delete", rename_all = "camelCase")]
    ChatDeleted { message_id: String },

    #[serde(rename = "voice:user-joined", rename_all = "camelCase")]
    VoiceUserJoined { connection_id: String },
    #[serde(rename = "voice:user-left", rename_all = "camelCase")]
    VoiceUserLeft { connection_id: String },
    #[serde(rename = "voice:new-producer", rename_all = "camelCase")]
    VoiceNewProducer {
        connection_id: String,
        producer_id: String,
    },
    #[serde(rename = "voice:producer-closed", rename_all = "camelCase")]
    VoiceProducerClosed {
        connection_id: String,
        producer_id: String,
    },

    #[serde(rename = "screen:started", rename_all = "camelCase")]
    ScreenStarted { sharer_id: String },
    #[serde(rename = "screen:stopped")]
    ScreenStopped,
    #[serde(rename = "screen:viewer-joined", rename_all = "camelCase")]
    ScreenViewerJoined { viewer_id: String },
    #[serde(rename = "screen:offer")]
    ScreenOffer(Value),
    #[serde(rename = "screen:answer")]
    ScreenAnswer(Value),
    #[serde(rename = "screen:ice-candidate")]
    ScreenIceCandidate(Value),

    #[serde(rename = "error")]
    Error { message: String },
}

/// Full room snapshot sent to a connection entering a room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateSnapshot {
    pub room_id: String,
    pub host_id: String,
    pub users: Vec<ParticipantInfo>,
    pub video: VideoSnapshot,
    pub chat: Vec<ChatMessage>,
    pub queue: Vec<QueueItem>,
    pub voice_members: Vec<String>,
    pub screen_sharer_id: Option<String>,
    pub is_hidden: bool,
}

impl RoomStateSnapshot {
    #[must_use]
    pub fn from_room(room: &Room, now_ms: i64) -> Self {
        let mut participants: Vec<_> = room.participants.values().collect();
        participants.sort_by_key(|p| p.join_seq);

        Self {
            room_id: room.code.clone(),
            host_id: room.host_id.as_str().to_string(),
            users: participants.iter().map(|p| p.info()).collect(),
            video: room.video.snapshot(now_ms),
            chat: room.chat.iter().cloned().collect(),
            queue: room.queue.clone(),
            voice_members: room
                .voice_members
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            screen_sharer_id: room.screen_sharer.as_ref().map(|c| c.as_str().to_string()),
            is_hidden: room.is_hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchparty_core::models::{ConnectionId, Participant};

    fn parse(json: &str) -> ClientFrame {
        serde_json::from_str(json).expect("frame parses")
    }

    #[test]
    fn test_parse_room_create_with_ack() {
        let frame = parse(r#"{"event":"room:create","data":{"userName":"Alice"},"ack":7}"#);
        assert_eq!(frame.ack, Some(7));
        match frame.event {
            ClientEvent::RoomCreate { user_name } => assert_eq!(user_name, "Alice"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_room_join() {
        let frame = parse(r#"{"event":"room:join","data":{"roomId":"ABC123","userName":"Bob"},"ack":1}"#);
        match frame.event {
            ClientEvent::RoomJoin { room_id, user_name } => {
                assert_eq!(room_id, "ABC123");
                assert_eq!(user_name, "Bob");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_payloadless_events() {
        assert!(matches!(parse(r#"{"event":"video:play"}"#).event, ClientEvent::VideoPlay));
        assert!(matches!(parse(r#"{"event":"video:ended"}"#).event, ClientEvent::VideoEnded));
        assert!(matches!(parse(r#"{"event":"room:leave"}"#).event, ClientEvent::RoomLeave));
        assert!(matches!(parse(r#"{"event":"voice:join","ack":3}"#).event, ClientEvent::VoiceJoin));
        assert!(matches!(parse(r#"{"event":"screen:start"}"#).event, ClientEvent::ScreenStart));
    }

    #[test]
    fn test_parse_video_pause_current_time() {
        let frame = parse(r#"{"event":"video:pause","data":{"currentTime":42.5}}"#);
        match frame.event {
            ClientEvent::VideoPause { current_time } => {
                assert!((current_time - 42.5).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_screen_offer_keeps_opaque_payload() {
        let frame = parse(
            r#"{"event":"screen:offer","data":{"to":"conn2","sdp":{"type":"offer","sdp":"v=0"}}}"#,
        );
        match frame.event {
            ClientEvent::ScreenOffer { to, payload } => {
                assert_eq!(to, "conn2");
                assert!(payload.contains_key("sdp"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_voice_resume_consumer() {
        let frame = parse(r#"{"event":"voice:resume-consumer","data":{"consumerId":"c1"},"ack":9}"#);
        match frame.event {
            ClientEvent::VoiceResumeConsumer { consumer_id } => assert_eq!(consumer_id, "c1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_fails_to_parse() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"event":"bogus:event","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_names() {
        let json = serde_json::to_string(&ServerEvent::RoomHostChanged {
            host_id: "u2".to_string(),
        })
        .expect("serialize");
        assert!(json.contains(r#""event":"room:host-changed""#));
        assert!(json.contains(r#""hostId":"u2""#));

        let json = serde_json::to_string(&ServerEvent::ScreenStopped).expect("serialize");
        assert!(json.contains(r#""event":"screen:stopped""#));

        let json = serde_json::to_string(&ServerEvent::Error {
            message: "nope".to_string(),
        })
        .expect("serialize");
        assert!(json.contains(r#""event":"error""#));
    }

    #[test]
    fn test_room_state_snapshot_users_in_join_order() {
        let host = Participant::new(ConnectionId::new(), "Alice", 0);
        let mut room = Room::new("ABC123".to_string(), host);
        room.add_participant(ConnectionId::new(), "Bob");
        room.add_participant(ConnectionId::new(), "Carol");

        let snapshot = RoomStateSnapshot::from_room(&room, 1_000);
        let names: Vec<_> = snapshot.users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(snapshot.room_id, "ABC123");
        assert_eq!(snapshot.video.timestamp, 1_000);
    }
}
