//! Process-wide room registry
//!
//! Owns the code → room map and the connection → room association. Rooms
//! are wrapped in a `tokio::sync::Mutex` so the dispatcher runs one
//! handler at a time per room while other rooms progress in parallel.
//! Creation and destruction go through the map's entry API; lobby and
//! health reads traverse the map without blocking mutations elsewhere.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{generate_room_code, ConnectionId, Participant, Room};
use crate::{Error, Result};

pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Mutex<Room>>>,
    memberships: DashMap<ConnectionId, String>,
}

/// Lobby listing entry for one visible room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRoom {
    pub id: String,
    pub user_count: usize,
    pub users: Vec<String>,
    pub video_title: String,
    pub video_url: String,
}

pub struct CreatedRoom {
    pub code: String,
    pub room: Arc<Mutex<Room>>,
    pub host: Participant,
}

pub struct JoinedRoom {
    pub room: Arc<Mutex<Room>>,
    pub participant: Participant,
}

pub struct LeaveOutcome {
    pub room_code: String,
    /// `None` when the departure emptied and destroyed the room
    pub room: Option<Arc<Mutex<Room>>>,
    pub departed: Participant,
    pub new_host: Option<ConnectionId>,
    pub was_in_voice: bool,
    pub was_sharer: bool,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Create a room with an unused code and the caller as host.
    pub async fn create(&self, conn: ConnectionId, display_name: &str) -> CreatedRoom {
        loop {
            let code = generate_room_code();
            let host = Participant::new(conn.clone(), display_name, 0);
            let room = Arc::new(Mutex::new(Room::new(code.clone(), host.clone())));

            // Rejection-sample: the vacant-entry insert is the collision
            // check, so concurrent creates cannot share a code.
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    vacant.insert(Arc::clone(&room));
                }
            }

            self.memberships.insert(conn, code.clone());
            info!(room = %code, host = %host.id, "Room created");
            return CreatedRoom { code, room, host };
        }
    }

    /// Join an existing room by code.
    pub async fn join(&self, code: &str, conn: ConnectionId, display_name: &str) -> Result<JoinedRoom> {
        let code = code.trim().to_ascii_uppercase();
        let room = self
            .rooms
            .get(&code)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(format!("Room {code} not found")))?;

        let mut guard = room.lock().await;
        // The room may have been destroyed between the lookup and the
        // lock; a destroyed room was removed from the map while empty.
        if guard.is_empty() || !self.rooms.contains_key(&code) {
            return Err(Error::NotFound(format!("Room {code} not found")));
        }
        let participant = guard.add_participant(conn.clone(), display_name);
        drop(guard);

        self.memberships.insert(conn, code);
        Ok(JoinedRoom {
            room,
            participant,
        })
    }

    /// Remove a connection from its room, promoting a new host when
    /// needed and destroying the room when it empties. SFU teardown for
    /// the connection must happen before this is called.
    pub async fn leave(&self, conn: &ConnectionId) -> Option<LeaveOutcome> {
        let code = self.memberships.remove(conn).map(|(_, code)| code)?;
        let room = self
            .rooms
            .get(&code)
            .map(|entry| Arc::clone(entry.value()))?;

        let mut guard = room.lock().await;
        let departure = guard.remove_participant(conn)?;
        let destroyed = departure.room_empty;
        if destroyed {
            // Removed while the lock is held so a racing join observes
            // either the live room or no room, never a zombie.
            self.rooms.remove(&code);
            info!(room = %code, "Room destroyed");
        }
        drop(guard);

        Some(LeaveOutcome {
            room_code: code,
            room: if destroyed { None } else { Some(room) },
            departed: departure.departed,
            new_host: departure.new_host,
            was_in_voice: departure.was_in_voice,
            was_sharer: departure.was_sharer,
        })
    }

    /// Room owning the given connection, if any.
    #[must_use]
    pub fn lookup(&self, conn: &ConnectionId) -> Option<Arc<Mutex<Room>>> {
        let code = self.memberships.get(conn)?;
        self.rooms.get(code.value()).map(|entry| Arc::clone(entry.value()))
    }

    /// Room code owning the given connection, if any.
    #[must_use]
    pub fn code_of(&self, conn: &ConnectionId) -> Option<String> {
        self.memberships.get(conn).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn lookup_by_code(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        let code = code.trim().to_ascii_uppercase();
        self.rooms.get(&code).map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.memberships.len()
    }

    /// All live rooms, for the heartbeat ticker.
    #[must_use]
    pub fn rooms_snapshot(&self) -> Vec<Arc<Mutex<Room>>> {
        self.rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Snapshot of rooms with `is_hidden == false` for the lobby
    /// endpoint. Each room's lock is taken only long enough to copy the
    /// listing fields.
    pub async fn enumerate_visible(&self) -> Vec<LobbyRoom> {
        let mut listing = Vec::new();
        for room in self.rooms_snapshot() {
            let guard = room.lock().await;
            if guard.is_hidden || guard.is_empty() {
                continue;
            }
            listing.push(LobbyRoom {
                id: guard.code.clone(),
                user_count: guard.participants.len(),
                users: guard.participant_names(),
                video_title: guard.current_title(),
                video_url: guard.video.video_url.clone(),
            });
        }
        listing.sort_by(|a, b| a.id.cmp(&b.id));
        listing
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROOM_CODE_LEN;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = RoomRegistry::new();
        let conn = ConnectionId::new();

        let created = registry.create(conn.clone(), "Alice").await;
        assert_eq!(created.code.len(), ROOM_CODE_LEN);
        assert_eq!(created.host.name, "Alice");
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.user_count(), 1);

        assert!(registry.lookup(&conn).is_some());
        assert!(registry.lookup_by_code(&created.code).is_some());
        assert_eq!(registry.code_of(&conn), Some(created.code.clone()));
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails() {
        let registry = RoomRegistry::new();
        let result = registry.join("ZZZZZZ", ConnectionId::new(), "Bob").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_join_is_case_insensitive() {
        let registry = RoomRegistry::new();
        let created = registry.create(ConnectionId::new(), "Alice").await;

        let joined = registry
            .join(&created.code.to_ascii_lowercase(), ConnectionId::new(), "Bob")
            .await
            .expect("join with lowercased code");
        assert_eq!(joined.participant.name, "Bob");
    }

    #[tokio::test]
    async fn test_create_join_scenario() {
        // Scenario: Alice creates, Bob joins; Bob's state sees Alice as
        // host and both users present.
        let registry = RoomRegistry::new();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();

        let created = registry.create(alice.clone(), "Alice").await;
        let joined = registry.join(&created.code, bob.clone(), "Bob").await.expect("join");

        let guard = joined.room.lock().await;
        assert_eq!(guard.host_id, alice);
        assert_eq!(guard.participants.len(), 2);
        assert!(guard.participants.contains_key(&bob));
    }

    #[tokio::test]
    async fn test_leave_promotes_earliest_joined() {
        // Scenario: [alice(host), bob, carol]; alice leaves; bob is host.
        let registry = RoomRegistry::new();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        let carol = ConnectionId::new();

        let created = registry.create(alice.clone(), "Alice").await;
        registry.join(&created.code, bob.clone(), "Bob").await.expect("bob joins");
        registry.join(&created.code, carol.clone(), "Carol").await.expect("carol joins");

        let outcome = registry.leave(&alice).await.expect("alice leaves");
        assert_eq!(outcome.departed.name, "Alice");
        assert_eq!(outcome.new_host, Some(bob.clone()));
        assert!(outcome.room.is_some());

        let room = outcome.room.expect("room survives");
        assert_eq!(room.lock().await.host_id, bob);
    }

    #[tokio::test]
    async fn test_last_leave_destroys_room() {
        let registry = RoomRegistry::new();
        let conn = ConnectionId::new();
        let created = registry.create(conn.clone(), "Alice").await;

        let outcome = registry.leave(&conn).await.expect("leaves");
        assert!(outcome.room.is_none());
        assert_eq!(registry.room_count(), 0);
        assert_eq!(registry.user_count(), 0);
        assert!(registry.lookup_by_code(&created.code).is_none());
    }

    #[tokio::test]
    async fn test_leave_then_rejoin_gets_fresh_membership() {
        let registry = RoomRegistry::new();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();

        let created = registry.create(alice, "Alice").await;
        registry.join(&created.code, bob.clone(), "Bob").await.expect("join");
        registry.leave(&bob).await.expect("leave");

        // A reconnect arrives as a new connection with the same name.
        let bob2 = ConnectionId::new();
        let joined = registry.join(&created.code, bob2.clone(), "Bob").await.expect("rejoin");
        assert_eq!(joined.participant.id, bob2);

        let guard = joined.room.lock().await;
        assert!(!guard.participants.contains_key(&bob));
        assert!(guard.participants.contains_key(&bob2));
    }

    #[tokio::test]
    async fn test_enumerate_visible_filters_hidden() {
        let registry = RoomRegistry::new();
        let a = registry.create(ConnectionId::new(), "Alice").await;
        let b = registry.create(ConnectionId::new(), "Bob").await;

        b.room.lock().await.is_hidden = true;

        let listing = registry.enumerate_visible().await;
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, a.code);
        assert_eq!(listing[0].users, vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_distinct_codes() {
        let registry = Arc::new(RoomRegistry::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.create(ConnectionId::new(), &format!("user{i}")).await.code
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for handle in handles {
            codes.insert(handle.await.expect("task"));
        }
        assert_eq!(codes.len(), 32);
        assert_eq!(registry.room_count(), 32);
    }
}
