use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};

use super::chat::{ChatMessage, CHAT_HISTORY_CAP};
use super::id::ConnectionId;
use super::participant::Participant;
use super::playback::{VideoState, VideoType};
use super::queue::QueueItem;

/// One independent coordination context identified by a 6-char code.
///
/// All fields are mutated under the room's dispatcher lock; the struct
/// itself carries no synchronization.
#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub host_id: ConnectionId,
    pub participants: HashMap<ConnectionId, Participant>,
    pub video: VideoState,
    pub chat: VecDeque<ChatMessage>,
    pub queue: Vec<QueueItem>,
    pub voice_members: HashSet<ConnectionId>,
    pub screen_sharer: Option<ConnectionId>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    /// Wall-clock ms until which further `ended` events are absorbed
    pub ended_guard_until: i64,
    next_join_seq: u64,
}

/// Result of removing a participant.
#[derive(Debug)]
pub struct Departure {
    pub departed: Participant,
    /// Set when the host left and another participant was promoted
    pub new_host: Option<ConnectionId>,
    pub was_in_voice: bool,
    pub was_sharer: bool,
    pub room_empty: bool,
}

impl Room {
    /// Create a room with the given participant as host.
    #[must_use]
    pub fn new(code: String, host: Participant) -> Self {
        let host_conn = host.id.clone();
        let mut participants = HashMap::new();
        participants.insert(host_conn.clone(), host);
        Self {
            code,
            host_id: host_conn,
            participants,
            video: VideoState::new(),
            chat: VecDeque::new(),
            queue: Vec::new(),
            voice_members: HashSet::new(),
            screen_sharer: None,
            is_hidden: false,
            created_at: Utc::now(),
            ended_guard_until: 0,
            next_join_seq: 1,
        }
    }

    /// Add a participant, assigning the next join sequence number.
    pub fn add_participant(&mut self, conn: ConnectionId, requested_name: &str) -> Participant {
        let seq = self.next_join_seq;
        self.next_join_seq += 1;
        let participant = Participant::new(conn.clone(), requested_name, seq);
        self.participants.insert(conn, participant.clone());
        participant
    }

    /// Remove a participant, promoting the earliest-joined remaining
    /// participant when the host departs. Also clears voice membership
    /// and the sharer slot for the departed connection.
    pub fn remove_participant(&mut self, conn: &ConnectionId) -> Option<Departure> {
        let departed = self.participants.remove(conn)?;
        let was_in_voice = self.voice_members.remove(conn);
        let was_sharer = self.screen_sharer.as_ref() == Some(conn);
        if was_sharer {
            self.screen_sharer = None;
        }

        let mut new_host = None;
        if &self.host_id == conn {
            if let Some(next) = self.earliest_joined() {
                self.host_id = next.clone();
                new_host = Some(next);
            }
        }

        Some(Departure {
            departed,
            new_host,
            was_in_voice,
            was_sharer,
            room_empty: self.participants.is_empty(),
        })
    }

    /// Earliest-joined participant by join sequence.
    #[must_use]
    pub fn earliest_joined(&self) -> Option<ConnectionId> {
        self.participants
            .values()
            .min_by_key(|p| p.join_seq)
            .map(|p| p.id.clone())
    }

    #[must_use]
    pub fn is_host(&self, conn: &ConnectionId) -> bool {
        &self.host_id == conn
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Append a chat message, dropping the oldest past the history cap.
    pub fn push_chat(&mut self, message: ChatMessage) {
        self.chat.push_back(message);
        while self.chat.len() > CHAT_HISTORY_CAP {
            self.chat.pop_front();
        }
    }

    /// Inject a system message and return it for broadcast.
    pub fn push_system_message(&mut self, content: impl Into<String>, now_ms: i64) -> ChatMessage {
        let message = ChatMessage::system(content.into(), now_ms);
        self.push_chat(message.clone());
        message
    }

    #[must_use]
    pub fn participant_names(&self) -> Vec<String> {
        let mut names: Vec<(u64, String)> = self
            .participants
            .values()
            .map(|p| (p.join_seq, p.name.clone()))
            .collect();
        names.sort_by_key(|(seq, _)| *seq);
        names.into_iter().map(|(_, name)| name).collect()
    }

    /// Title shown in the lobby for the currently loaded video.
    #[must_use]
    pub fn current_title(&self) -> String {
        match self.video.video_type {
            VideoType::Youtube => self.video.video_id.clone(),
            VideoType::Direct => self
                .video
                .video_url
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .split('?')
                .next()
                .unwrap_or_default()
                .to_string(),
            VideoType::None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with(names: &[&str]) -> (Room, Vec<ConnectionId>) {
        let mut conns = vec![ConnectionId::new()];
        let host = Participant::new(conns[0].clone(), names[0], 0);
        let mut room = Room::new("ABC123".to_string(), host);
        for name in &names[1..] {
            let conn = ConnectionId::new();
            room.add_participant(conn.clone(), name);
            conns.push(conn);
        }
        (room, conns)
    }

    #[test]
    fn test_creator_is_host() {
        let (room, conns) = room_with(&["Alice"]);
        assert_eq!(room.host_id, conns[0]);
        assert_eq!(room.participants.len(), 1);
    }

    #[test]
    fn test_host_transfer_earliest_joined() {
        let (mut room, conns) = room_with(&["Alice", "Bob", "Carol"]);

        let departure = room.remove_participant(&conns[0]).expect("alice present");
        assert_eq!(departure.departed.name, "Alice");
        assert_eq!(departure.new_host, Some(conns[1].clone()));
        assert_eq!(room.host_id, conns[1]);
        assert!(!departure.room_empty);
    }

    #[test]
    fn test_non_host_departure_keeps_host() {
        let (mut room, conns) = room_with(&["Alice", "Bob"]);
        let departure = room.remove_participant(&conns[1]).expect("bob present");
        assert!(departure.new_host.is_none());
        assert_eq!(room.host_id, conns[0]);
    }

    #[test]
    fn test_last_departure_empties_room() {
        let (mut room, conns) = room_with(&["Alice"]);
        let departure = room.remove_participant(&conns[0]).expect("alice present");
        assert!(departure.room_empty);
        assert!(departure.new_host.is_none());
    }

    #[test]
    fn test_departure_clears_voice_and_sharer() {
        let (mut room, conns) = room_with(&["Alice", "Bob"]);
        room.voice_members.insert(conns[1].clone());
        room.screen_sharer = Some(conns[1].clone());

        room.remove_participant(&conns[1]);
        assert!(room.voice_members.is_empty());
        assert!(room.screen_sharer.is_none());
    }

    #[test]
    fn test_voice_members_subset_of_participants() {
        let (mut room, conns) = room_with(&["Alice", "Bob", "Carol"]);
        for conn in &conns {
            room.voice_members.insert(conn.clone());
        }
        room.remove_participant(&conns[2]);
        assert!(room
            .voice_members
            .iter()
            .all(|c| room.participants.contains_key(c)));
        assert!(room.voice_members.len() <= room.participants.len());
    }

    #[test]
    fn test_chat_cap_drops_oldest() {
        let (mut room, _) = room_with(&["Alice"]);
        for i in 0..(CHAT_HISTORY_CAP + 25) {
            room.push_system_message(format!("msg {i}"), i as i64);
        }
        assert_eq!(room.chat.len(), CHAT_HISTORY_CAP);
        assert_eq!(room.chat.front().map(|m| m.content.as_str()), Some("msg 25"));
    }

    #[test]
    fn test_participant_names_in_join_order() {
        let (room, _) = room_with(&["Alice", "Bob", "Carol"]);
        assert_eq!(room.participant_names(), vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_current_title_direct_url_tail() {
        let (mut room, _) = room_with(&["Alice"]);
        room.video.video_type = VideoType::Direct;
        room.video.video_url = "https://cdn.example.com/media/movie.mp4?sig=abc".to_string();
        assert_eq!(room.current_title(), "movie.mp4");
    }
}
