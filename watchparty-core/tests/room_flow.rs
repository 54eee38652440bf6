//! Integration tests for watchparty-core
//!
//! Exercise the registry and the playback state machine together, the
//! way the dispatcher drives them.
//!
//! Run with: cargo test --test room_flow

use watchparty_core::models::{ConnectionId, VideoSnapshot, VideoState, VideoType};
use watchparty_core::service::{playback, registry::RoomRegistry, url::VideoSource, Transition};

/// Minimal model of a client that applies every snapshot in `seq` order.
#[derive(Debug, Default)]
struct ClientView {
    video_id: String,
    video_url: String,
    is_playing: bool,
    current_time: f64,
    rate: f64,
    seq: u64,
    last_timestamp: i64,
}

impl ClientView {
    fn apply(&mut self, snapshot: &VideoSnapshot) {
        // Stale or redundant pushes are discarded by seq.
        if snapshot.seq <= self.seq && self.seq != 0 {
            return;
        }
        self.video_id = snapshot.video_id.clone();
        self.video_url = snapshot.video_url.clone();
        self.is_playing = snapshot.is_playing;
        self.current_time = snapshot.current_time;
        self.rate = snapshot.rate;
        self.seq = snapshot.seq;
        self.last_timestamp = snapshot.timestamp;
    }
}

#[test]
fn test_client_replaying_snapshots_converges() {
    let mut state = VideoState::new();
    let mut client = ClientView::default();
    let mut snapshots = Vec::new();

    let t0 = 1_000_000;
    let source = VideoSource::Youtube {
        id: "dQw4w9WgXcQ".to_string(),
    };

    snapshots.push(playback::load(&mut state, &source, "https://youtu.be/dQw4w9WgXcQ", t0));
    if let Transition::Applied(s) = playback::pause(&mut state, 12.0, t0 + 12_000).expect("pause") {
        snapshots.push(s);
    }
    if let Transition::Applied(s) = playback::play(&mut state, t0 + 20_000) {
        snapshots.push(s);
    }
    snapshots.push(playback::seek(&mut state, 90.0, t0 + 25_000).expect("seek"));
    snapshots.push(playback::set_rate(&mut state, 1.5, t0 + 30_000).expect("rate"));

    for snapshot in &snapshots {
        client.apply(snapshot);
    }

    assert_eq!(client.video_id, state.video_id);
    assert_eq!(client.video_url, state.video_url);
    assert_eq!(client.is_playing, state.is_playing);
    assert!((client.rate - state.rate).abs() < f64::EPSILON);
    assert_eq!(client.seq, state.seq);
    // Position agrees at the instant the last snapshot was taken.
    assert!((client.current_time - state.position_at(client.last_timestamp)).abs() < 1e-9);
}

#[test]
fn test_out_of_order_and_duplicate_snapshots_are_discarded() {
    let mut state = VideoState::new();
    let source = VideoSource::Direct;

    let first = playback::load(&mut state, &source, "https://cdn.example.com/a.mp4", 1_000);
    let second = playback::seek(&mut state, 30.0, 2_000).expect("seek");

    let mut client = ClientView::default();
    client.apply(&second);
    client.apply(&first); // stale: lower seq
    client.apply(&second); // duplicate

    assert_eq!(client.seq, second.seq);
    assert!((client.current_time - 30.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_rooms_progress_independently() {
    let registry = RoomRegistry::new();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    let room_a = registry.create(alice, "Alice").await;
    let room_b = registry.create(bob, "Bob").await;
    assert_ne!(room_a.code, room_b.code);

    {
        let mut guard = room_a.room.lock().await;
        playback::load(
            &mut guard.video,
            &VideoSource::Direct,
            "https://cdn.example.com/a.mp4",
            1_000,
        );
        playback::seek(&mut guard.video, 10.0, 2_000).expect("seek");
    }

    let guard_a = room_a.room.lock().await;
    let guard_b = room_b.room.lock().await;
    assert_eq!(guard_a.video.seq, 2);
    assert_eq!(guard_b.video.seq, 0);
    assert_eq!(guard_b.video.video_type, VideoType::None);
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let registry = RoomRegistry::new();
    let alice = ConnectionId::new();
    let bob = ConnectionId::new();

    // Alice creates, Bob joins.
    let created = registry.create(alice.clone(), "Alice").await;
    registry.join(&created.code, bob.clone(), "Bob").await.expect("join");

    // A video is loaded and everyone watches.
    {
        let mut guard = created.room.lock().await;
        playback::load(
            &mut guard.video,
            &VideoSource::Youtube {
                id: "dQw4w9WgXcQ".to_string(),
            },
            "https://youtu.be/dQw4w9WgXcQ",
            1_000,
        );
        guard.voice_members.insert(alice.clone());
        guard.voice_members.insert(bob.clone());
    }

    // Alice (host) disconnects: Bob inherits the room.
    let outcome = registry.leave(&alice).await.expect("alice leaves");
    assert_eq!(outcome.new_host, Some(bob.clone()));
    assert!(outcome.was_in_voice);

    {
        let room = outcome.room.expect("room survives");
        let guard = room.lock().await;
        assert_eq!(guard.host_id, bob);
        assert_eq!(guard.voice_members.len(), 1);
        // The video kept playing through the host change.
        assert!(guard.video.is_playing);
    }

    // Bob leaves too: the room and its code are gone.
    let outcome = registry.leave(&bob).await.expect("bob leaves");
    assert!(outcome.room.is_none());
    assert!(registry.lookup_by_code(&created.code).is_none());
    assert_eq!(registry.room_count(), 0);
}
