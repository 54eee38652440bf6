//! Video state machine transitions
//!
//! Pure functions over `VideoState` taking the current wall-clock in
//! milliseconds, so transitions unit-test without a clock. The dispatcher
//! applies them under the room lock and broadcasts the returned snapshot.
//!
//! Echo suppression: clients mirror the global state into their media
//! element, which fires native play/pause events the client forwards
//! back. A play while playing (or pause while paused) therefore carries
//! no information and must not reset the anchor, which would roll every
//! viewer back by the forwarding latency.

use crate::models::{QueueItem, Room, VideoSnapshot, VideoState, VideoType};
use crate::service::url::VideoSource;
use crate::{Error, Result};

pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 4.0;

/// How long duplicate `ended` events from racing clients are absorbed
pub const ENDED_GUARD_MS: i64 = 2_000;

/// Outcome of a play/pause transition.
#[derive(Debug, Clone)]
pub enum Transition {
    /// State changed; broadcast the snapshot
    Applied(VideoSnapshot),
    /// Redundant event; no state change, no outbound event
    Suppressed,
}

/// Load a classified URL as the current video. Playback starts at
/// position 0 immediately.
pub fn load(state: &mut VideoState, source: &VideoSource, url: &str, now_ms: i64) -> VideoSnapshot {
    match source {
        VideoSource::Youtube { id } => {
            state.video_id = id.clone();
            state.video_type = VideoType::Youtube;
        }
        VideoSource::Direct => {
            state.video_id = String::new();
            state.video_type = VideoType::Direct;
        }
    }
    state.video_url = url.to_string();
    state.is_playing = true;
    state.anchor_position = 0.0;
    state.anchor_wall_time = now_ms;
    state.seq += 1;
    state.snapshot(now_ms)
}

/// Resume playback. Ignored when already playing.
pub fn play(state: &mut VideoState, now_ms: i64) -> Transition {
    if state.is_playing {
        return Transition::Suppressed;
    }
    state.is_playing = true;
    state.anchor_wall_time = now_ms;
    state.seq += 1;
    Transition::Applied(state.snapshot(now_ms))
}

/// Pause at the client-reported position. Ignored when already paused.
pub fn pause(state: &mut VideoState, position: f64, now_ms: i64) -> Result<Transition> {
    if position < 0.0 {
        return Err(Error::InvalidInput(
            "Pause position must be non-negative".to_string(),
        ));
    }
    if !state.is_playing {
        return Ok(Transition::Suppressed);
    }
    state.is_playing = false;
    state.anchor_position = position;
    state.anchor_wall_time = now_ms;
    state.seq += 1;
    Ok(Transition::Applied(state.snapshot(now_ms)))
}

/// Seek to the client-reported position. Always applied: a seek carries
/// new information regardless of the current state.
pub fn seek(state: &mut VideoState, position: f64, now_ms: i64) -> Result<VideoSnapshot> {
    if position < 0.0 {
        return Err(Error::InvalidInput(
            "Seek position must be non-negative".to_string(),
        ));
    }
    state.anchor_position = position;
    state.anchor_wall_time = now_ms;
    state.seq += 1;
    Ok(state.snapshot(now_ms))
}

/// Change the playback rate. The anchor is recomputed at the current
/// effective position first so the instantaneous position is continuous
/// across the rate change.
pub fn set_rate(state: &mut VideoState, rate: f64, now_ms: i64) -> Result<VideoSnapshot> {
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(Error::InvalidInput(format!(
            "Rate must be between {MIN_RATE} and {MAX_RATE}"
        )));
    }
    state.anchor_position = state.position_at(now_ms);
    state.anchor_wall_time = now_ms;
    state.rate = rate;
    state.seq += 1;
    Ok(state.snapshot(now_ms))
}

/// Handle end-of-video: pop the queue head and load it as the current
/// video. Guarded by the room's ended-lock so the duplicate `ended`
/// events multiple clients fire on completion advance the queue once.
pub fn ended(room: &mut Room, now_ms: i64) -> Option<(QueueItem, VideoSnapshot)> {
    if now_ms < room.ended_guard_until {
        return None;
    }
    room.ended_guard_until = now_ms + ENDED_GUARD_MS;

    if room.queue.is_empty() {
        return None;
    }
    let item = room.queue.remove(0);
    let source = if item.video_id.is_empty() {
        VideoSource::Direct
    } else {
        VideoSource::Youtube {
            id: item.video_id.clone(),
        }
    };
    let snapshot = load(&mut room.video, &source, &item.video_url, now_ms);
    Some((item, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionId, Participant};

    fn playing_state(anchor_position: f64, anchor_wall_time: i64, seq: u64) -> VideoState {
        VideoState {
            video_id: "dQw4w9WgXcQ".to_string(),
            video_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            video_type: VideoType::Youtube,
            is_playing: true,
            anchor_position,
            anchor_wall_time,
            rate: 1.0,
            seq,
        }
    }

    #[test]
    fn test_load_starts_playing_at_zero() {
        let mut state = VideoState::new();
        let source = VideoSource::Youtube {
            id: "dQw4w9WgXcQ".to_string(),
        };
        let snap = load(&mut state, &source, "https://youtu.be/dQw4w9WgXcQ", 5_000);

        assert!(state.is_playing);
        assert_eq!(state.video_type, VideoType::Youtube);
        assert_eq!(state.seq, 1);
        assert!((snap.current_time - 0.0).abs() < f64::EPSILON);
        assert_eq!(snap.timestamp, 5_000);
    }

    #[test]
    fn test_play_while_playing_is_suppressed() {
        // Scenario: {isPlaying:true, anchorPosition:30, anchorWallTime:T0, seq:5}
        let mut state = playing_state(30.0, 1_000, 5);
        let before = state.clone();

        assert!(matches!(play(&mut state, 2_000), Transition::Suppressed));
        assert_eq!(state.seq, before.seq);
        assert_eq!(state.anchor_wall_time, before.anchor_wall_time);
        assert!((state.anchor_position - before.anchor_position).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pause_while_paused_is_suppressed() {
        let mut state = playing_state(30.0, 1_000, 5);
        state.is_playing = false;

        let transition = pause(&mut state, 99.0, 2_000).expect("valid position");
        assert!(matches!(transition, Transition::Suppressed));
        assert_eq!(state.seq, 5);
        assert!((state.anchor_position - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_play_from_pause_keeps_position() {
        let mut state = playing_state(30.0, 1_000, 5);
        state.is_playing = false;

        match play(&mut state, 9_000) {
            Transition::Applied(snap) => {
                assert_eq!(snap.seq, 6);
                assert!((snap.current_time - 30.0).abs() < f64::EPSILON);
            }
            Transition::Suppressed => panic!("play from pause must apply"),
        }
        assert_eq!(state.anchor_wall_time, 9_000);
    }

    #[test]
    fn test_pause_adopts_reported_position() {
        let mut state = playing_state(10.0, 0, 3);
        match pause(&mut state, 14.8, 15_000).expect("valid position") {
            Transition::Applied(snap) => {
                assert_eq!(snap.seq, 4);
                assert!(!snap.is_playing);
                assert!((snap.current_time - 14.8).abs() < f64::EPSILON);
            }
            Transition::Suppressed => panic!("pause from play must apply"),
        }
    }

    #[test]
    fn test_seek_always_applies() {
        let mut state = playing_state(10.0, 0, 3);
        let snap = seek(&mut state, 120.0, 1_000).expect("valid position");
        assert_eq!(snap.seq, 4);
        assert!((snap.current_time - 120.0).abs() < f64::EPSILON);

        // seek while paused also applies
        state.is_playing = false;
        let snap = seek(&mut state, 60.0, 2_000).expect("valid position");
        assert_eq!(snap.seq, 5);
        assert!((snap.current_time - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_seek_rejects_negative() {
        let mut state = playing_state(10.0, 0, 3);
        assert!(seek(&mut state, -1.0, 1_000).is_err());
        assert_eq!(state.seq, 3);
    }

    #[test]
    fn test_rate_change_position_continuity() {
        // Scenario: from {isPlaying:true, anchorPosition:0, anchorWallTime:T0,
        // rate:1.0, seq:7}, at T0+10000 a rate change to 2.0 arrives.
        let t0 = 50_000;
        let mut state = playing_state(0.0, t0, 7);

        let before = state.position_at(t0 + 10_000);
        let snap = set_rate(&mut state, 2.0, t0 + 10_000).expect("valid rate");

        assert!((state.anchor_position - 10.0).abs() < 1e-9);
        assert_eq!(state.anchor_wall_time, t0 + 10_000);
        assert!((state.rate - 2.0).abs() < f64::EPSILON);
        assert_eq!(state.seq, 8);
        assert!((snap.current_time - 10.0).abs() < 1e-9);
        assert!((snap.current_time - before).abs() < 1e-9);
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        let mut state = playing_state(0.0, 0, 1);
        assert!(set_rate(&mut state, 0.0, 1_000).is_err());
        assert!(set_rate(&mut state, 8.0, 1_000).is_err());
        assert_eq!(state.seq, 1);
    }

    #[test]
    fn test_seq_strictly_monotonic_across_transitions() {
        let mut state = VideoState::new();
        let mut last_seq = state.seq;
        let source = VideoSource::Direct;

        let mut check = |seq: u64, last: &mut u64| {
            assert!(seq > *last, "seq must strictly increase");
            *last = seq;
        };

        check(load(&mut state, &source, "https://x.test/a.mp4", 1_000).seq, &mut last_seq);
        if let Transition::Applied(s) = pause(&mut state, 1.0, 2_000).expect("ok") {
            check(s.seq, &mut last_seq);
        }
        if let Transition::Applied(s) = play(&mut state, 3_000) {
            check(s.seq, &mut last_seq);
        }
        check(seek(&mut state, 5.0, 4_000).expect("ok").seq, &mut last_seq);
        check(set_rate(&mut state, 1.5, 5_000).expect("ok").seq, &mut last_seq);
    }

    fn test_room() -> Room {
        let host = Participant::new(ConnectionId::new(), "Alice", 0);
        Room::new("ABC123".to_string(), host)
    }

    #[test]
    fn test_ended_advances_queue_once() {
        // Scenario: queue = [Y, Z]; three clients fire `ended` within 200 ms.
        let mut room = test_room();
        for id in ["yyyyyyyyyyy", "zzzzzzzzzzz"] {
            room.queue.push(QueueItem::new(
                id.to_string(),
                format!("https://youtu.be/{id}"),
                id.to_string(),
                "Alice".to_string(),
                0,
            ));
        }

        let first = ended(&mut room, 10_000);
        let (item, snap) = first.expect("first ended advances");
        assert_eq!(item.video_id, "yyyyyyyyyyy");
        assert_eq!(room.video.video_id, "yyyyyyyyyyy");
        assert!(snap.is_playing);
        assert_eq!(room.queue.len(), 1);

        assert!(ended(&mut room, 10_100).is_none());
        assert!(ended(&mut room, 10_200).is_none());
        assert_eq!(room.queue.len(), 1);
        assert_eq!(room.queue[0].video_id, "zzzzzzzzzzz");
    }

    #[test]
    fn test_ended_after_guard_expiry_advances_again() {
        let mut room = test_room();
        for id in ["yyyyyyyyyyy", "zzzzzzzzzzz"] {
            room.queue.push(QueueItem::new(
                id.to_string(),
                format!("https://youtu.be/{id}"),
                id.to_string(),
                "Alice".to_string(),
                0,
            ));
        }

        assert!(ended(&mut room, 10_000).is_some());
        assert!(ended(&mut room, 10_000 + ENDED_GUARD_MS).is_some());
        assert!(room.queue.is_empty());
    }

    #[test]
    fn test_ended_with_empty_queue_is_noop() {
        let mut room = test_room();
        let seq_before = room.video.seq;
        assert!(ended(&mut room, 10_000).is_none());
        assert_eq!(room.video.seq, seq_before);
    }

    #[test]
    fn test_ended_loads_direct_queue_items() {
        let mut room = test_room();
        room.queue.push(QueueItem::new(
            String::new(),
            "https://cdn.example.com/movie.mp4".to_string(),
            "movie.mp4".to_string(),
            "Alice".to_string(),
            0,
        ));

        let (_, snap) = ended(&mut room, 10_000).expect("advances");
        assert_eq!(snap.video_type, VideoType::Direct);
        assert_eq!(room.video.video_type, VideoType::Direct);
    }
}
