//! Heartbeat ticker
//!
//! Every 3 seconds each room with at least two participants, a loaded
//! video, and active playback gets the current snapshot as an advisory
//! `video:heartbeat`. Heartbeats never bump `seq`, so a client that
//! applies snapshots in `seq` order can always discard them as stale
//! relative to live updates.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::info;

use watchparty_core::models::ConnectionId;
use watchparty_core::now_ms;
use watchparty_core::service::RoomRegistry;

use crate::ws::hub::ConnectionHub;
use crate::ws::protocol::ServerEvent;

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(3);

const MIN_PARTICIPANTS: usize = 2;

/// Spawn the process-wide heartbeat task.
pub fn spawn(registry: Arc<RoomRegistry>, hub: Arc<ConnectionHub>) -> JoinHandle<()> {
    info!(period_secs = HEARTBEAT_PERIOD.as_secs(), "Heartbeat ticker started");
    tokio::spawn(async move {
        let mut ticker = interval(HEARTBEAT_PERIOD);
        loop {
            ticker.tick().await;
            tick(&registry, &hub).await;
        }
    })
}

async fn tick(registry: &RoomRegistry, hub: &ConnectionHub) {
    for room in registry.rooms_snapshot() {
        let guard = room.lock().await;
        let eligible = guard.participants.len() >= MIN_PARTICIPANTS
            && guard.video.has_video()
            && guard.video.is_playing;
        if !eligible {
            continue;
        }

        let snapshot = guard.video.snapshot(now_ms());
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();
        hub.send_to_many(&targets, &ServerEvent::VideoHeartbeat(snapshot));
    }
}
