//! SFU manager: worker pool and room registry
//!
//! N workers are created at startup, each owning one `WebRtcServer`
//! bound to UDP+TCP on `port + index`. New rooms pick a worker
//! round-robin; the router↔worker binding is fixed for the room's life.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mediasoup::prelude::*;
use mediasoup::worker_manager::WorkerManager;
use tracing::{debug, error, info};

use crate::config::SfuConfig;
use crate::error::SfuError;
use crate::room::SfuRoom;
use crate::types::ClosedPeer;

struct WorkerHandle {
    worker: Worker,
    webrtc_server: WebRtcServer,
}

pub struct SfuManager {
    config: SfuConfig,
    // Keeps the worker subprocess supervisor alive for the process life
    _worker_manager: WorkerManager,
    workers: Vec<WorkerHandle>,
    next_worker: AtomicUsize,
    rooms: DashMap<String, Arc<SfuRoom>>,
}

fn worker_settings() -> WorkerSettings {
    let mut settings = WorkerSettings::default();
    settings.log_level = WorkerLogLevel::Warn;
    settings.log_tags = vec![
        WorkerLogTag::Info,
        WorkerLogTag::Ice,
        WorkerLogTag::Dtls,
        WorkerLogTag::Rtp,
    ];
    settings
}

impl SfuManager {
    /// Spawn the worker pool. A worker dying later is fatal: the process
    /// exits and clients reconnect against a fresh instance.
    pub async fn new(config: SfuConfig) -> Result<Arc<Self>, SfuError> {
        let worker_manager = WorkerManager::new();
        let mut workers = Vec::with_capacity(config.num_workers);

        for index in 0..config.num_workers {
            let worker = worker_manager
                .create_worker(worker_settings())
                .await
                .map_err(|e| SfuError::Worker(e.to_string()))?;

            worker
                .on_dead(move |reason| {
                    error!(worker = index, ?reason, "mediasoup worker died, exiting");
                    std::process::exit(1);
                })
                .detach();

            let port = config.port + index as u16;
            let listen_infos = WebRtcServerListenInfos::new(config.listen_info(Protocol::Udp, port))
                .insert(config.listen_info(Protocol::Tcp, port));
            let webrtc_server = worker
                .create_webrtc_server(WebRtcServerOptions::new(listen_infos))
                .await
                .map_err(|e| SfuError::Worker(e.to_string()))?;

            info!(worker = index, port, "SFU worker ready");
            workers.push(WorkerHandle {
                worker,
                webrtc_server,
            });
        }

        Ok(Arc::new(Self {
            config,
            _worker_manager: worker_manager,
            workers,
            next_worker: AtomicUsize::new(0),
            rooms: DashMap::new(),
        }))
    }

    /// Get the room's SFU state, creating the router lazily on the first
    /// `voice:join` for that room.
    pub async fn get_or_create_room(&self, code: &str) -> Result<Arc<SfuRoom>, SfuError> {
        if let Some(room) = self.rooms.get(code) {
            return Ok(Arc::clone(room.value()));
        }

        let index = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        let handle = &self.workers[index];
        let room = Arc::new(
            SfuRoom::new(
                code.to_string(),
                &handle.worker,
                handle.webrtc_server.clone(),
                self.config.initial_available_outgoing_bitrate,
            )
            .await?,
        );

        // A concurrent creator may have won the race; its router wins and
        // ours closes on drop.
        match self.rooms.entry(code.to_string()) {
            Entry::Occupied(existing) => Ok(Arc::clone(existing.get())),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&room));
                info!(room = code, worker = index, "SFU room created");
                Ok(room)
            }
        }
    }

    /// Room lookup without creation, used by handshake steps after
    /// `voice:join`.
    #[must_use]
    pub fn room(&self, code: &str) -> Option<Arc<SfuRoom>> {
        self.rooms.get(code).map(|entry| Arc::clone(entry.value()))
    }

    /// Tear down a participant's peer and destroy the room when its peer
    /// set empties.
    pub async fn remove_peer(&self, code: &str, conn: &str) -> Option<ClosedPeer> {
        let room = self.room(code)?;
        let closed = room.remove_peer(conn).await;

        if room.is_empty().await {
            self.rooms.remove(code);
            debug!(room = code, "SFU room destroyed");
        }
        closed
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
