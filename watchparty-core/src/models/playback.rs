use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Youtube,
    Direct,
    None,
}

/// Canonical playback state for one room.
///
/// Stores an anchor `(position, wall_time)` pair rather than a live
/// position; the effective position at any instant is derived from it.
/// Mutated only by the event dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoState {
    pub video_id: String,
    pub video_url: String,
    pub video_type: VideoType,
    pub is_playing: bool,
    /// Playback position in seconds at `anchor_wall_time`
    pub anchor_position: f64,
    /// Wall-clock milliseconds when the anchor was taken
    pub anchor_wall_time: i64,
    pub rate: f64,
    /// Strictly monotonic per room; heartbeats never advance it
    pub seq: u64,
}

impl VideoState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            video_id: String::new(),
            video_url: String::new(),
            video_type: VideoType::None,
            is_playing: false,
            anchor_position: 0.0,
            anchor_wall_time: 0,
            rate: 1.0,
            seq: 0,
        }
    }

    #[must_use]
    pub fn has_video(&self) -> bool {
        self.video_type != VideoType::None
    }

    /// Effective playback position at wall-clock `now_ms`.
    #[must_use]
    pub fn position_at(&self, now_ms: i64) -> f64 {
        if self.is_playing {
            let elapsed_secs = (now_ms - self.anchor_wall_time) as f64 / 1000.0;
            self.anchor_position + elapsed_secs * self.rate
        } else {
            self.anchor_position
        }
    }

    /// Outbound snapshot stamped at `now_ms`, carrying the computed
    /// effective position so clients do no clock arithmetic.
    #[must_use]
    pub fn snapshot(&self, now_ms: i64) -> VideoSnapshot {
        VideoSnapshot {
            video_id: self.video_id.clone(),
            video_url: self.video_url.clone(),
            video_type: self.video_type,
            is_playing: self.is_playing,
            current_time: self.position_at(now_ms),
            rate: self.rate,
            seq: self.seq,
            timestamp: now_ms,
        }
    }
}

impl Default for VideoState {
    fn default() -> Self {
        Self::new()
    }
}

/// What goes on the wire. `current_time` is the server-computed position
/// at `timestamp`, never the raw anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnapshot {
    pub video_id: String,
    pub video_url: String,
    pub video_type: VideoType,
    pub is_playing: bool,
    pub current_time: f64,
    pub rate: f64,
    pub seq: u64,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = VideoState::new();
        assert_eq!(state.video_type, VideoType::None);
        assert!(!state.is_playing);
        assert!((state.rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(state.seq, 0);
    }

    #[test]
    fn test_position_frozen_while_paused() {
        let state = VideoState {
            anchor_position: 42.5,
            anchor_wall_time: 1_000,
            is_playing: false,
            ..VideoState::new()
        };
        assert!((state.position_at(99_000) - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_position_advances_while_playing() {
        let state = VideoState {
            anchor_position: 10.0,
            anchor_wall_time: 1_000,
            is_playing: true,
            rate: 1.0,
            ..VideoState::new()
        };
        // 5 seconds of wall time at 1x
        assert!((state.position_at(6_000) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_scales_with_rate() {
        let state = VideoState {
            anchor_position: 0.0,
            anchor_wall_time: 0,
            is_playing: true,
            rate: 2.0,
            ..VideoState::new()
        };
        assert!((state.position_at(10_000) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_carries_computed_position() {
        let state = VideoState {
            anchor_position: 30.0,
            anchor_wall_time: 0,
            is_playing: true,
            rate: 1.0,
            seq: 5,
            ..VideoState::new()
        };
        let snap = state.snapshot(4_000);
        assert!((snap.current_time - 34.0).abs() < 1e-9);
        assert_eq!(snap.timestamp, 4_000);
        assert_eq!(snap.seq, 5);
    }

    #[test]
    fn test_snapshot_serialization_roundtrip() {
        let state = VideoState::new();
        let snap = state.snapshot(1_234);
        let json = serde_json::to_string(&snap).expect("serialize");
        assert!(json.contains("\"currentTime\""));
        assert!(json.contains("\"videoType\":\"none\""));
        let back: VideoSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.seq, snap.seq);
        assert_eq!(back.timestamp, snap.timestamp);
    }
}
