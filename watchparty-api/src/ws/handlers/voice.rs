//! `voice:*` handlers: the SFU control-plane handshake
//!
//! Every step is a client-driven request; the server never mutates SFU
//! state speculatively, so a failed step can be retried from that step.

use mediasoup::prelude::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters};
use serde_json::json;
use tracing::{info, warn};

use watchparty_core::models::ConnectionId;
use watchparty_core::Error;
use watchparty_sfu::SfuRoom;

use crate::ws::dispatcher::Dispatcher;
use crate::ws::protocol::ServerEvent;

impl Dispatcher {
    fn sfu_room_of(
        &self,
        conn: &ConnectionId,
        ack: Option<u64>,
    ) -> Option<std::sync::Arc<SfuRoom>> {
        let code = self.require_room_code(conn, ack)?;
        match self.sfu.room(&code) {
            Some(room) => Some(room),
            None => {
                self.report(
                    conn,
                    ack,
                    &Error::NotFound("Voice session not started".to_string()),
                );
                None
            }
        }
    }

    /// Step 1: ensure router + peer, reply with router capabilities and
    /// the late-join producer enumeration.
    pub(crate) async fn on_voice_join(&self, conn: &ConnectionId, ack: Option<u64>) {
        let Some(code) = self.require_room_code(conn, ack) else {
            return;
        };
        let sfu_room = match self.sfu.get_or_create_room(&code).await {
            Ok(room) => room,
            Err(e) => {
                warn!(room = %code, error = %e, "SFU room creation failed");
                self.report(conn, ack, &Error::Sfu(e.to_string()));
                return;
            }
        };
        sfu_room.ensure_peer(conn.as_str()).await;

        let rtp_capabilities = sfu_room.rtp_capabilities();
        let existing_producers = sfu_room.existing_producers(conn.as_str()).await;

        if let Some(id) = ack {
            self.hub.send_ack(
                conn,
                id,
                json!({
                    "rtpCapabilities": rtp_capabilities,
                    "existingProducers": existing_producers,
                }),
            );
        }

        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        guard.voice_members.insert(conn.clone());
        let others: Vec<ConnectionId> = guard
            .participants
            .keys()
            .filter(|c| *c != conn)
            .cloned()
            .collect();

        self.hub.send_to_many(
            &others,
            &ServerEvent::VoiceUserJoined {
                connection_id: conn.as_str().to_string(),
            },
        );
        drop(guard);

        info!(room = %code, user = %conn, "Joined voice");
    }

    pub(crate) async fn on_voice_leave(&self, conn: &ConnectionId) {
        let Some(code) = self.registry.code_of(conn) else {
            return;
        };
        let closed = self.sfu.remove_peer(&code, conn.as_str()).await;

        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let mut guard = room.lock().await;
        if !guard.voice_members.remove(conn) {
            return;
        }
        let targets: Vec<ConnectionId> = guard.participants.keys().cloned().collect();

        self.hub.send_to_many(
            &targets,
            &ServerEvent::VoiceUserLeft {
                connection_id: conn.as_str().to_string(),
            },
        );
        if let Some(producer_id) = closed.and_then(|c| c.producer_id) {
            self.hub.send_to_many(
                &targets,
                &ServerEvent::VoiceProducerClosed {
                    connection_id: conn.as_str().to_string(),
                    producer_id,
                },
            );
        }
        drop(guard);

        info!(room = %code, user = %conn, "Left voice");
    }

    /// Steps 2 and 3: allocate a send or receive transport.
    pub(crate) async fn on_voice_create_transport(
        &self,
        conn: &ConnectionId,
        send: bool,
        ack: Option<u64>,
    ) {
        let Some(sfu_room) = self.sfu_room_of(conn, ack) else {
            return;
        };
        let result = if send {
            sfu_room.create_send_transport(conn.as_str()).await
        } else {
            sfu_room.create_recv_transport(conn.as_str()).await
        };
        match result {
            Ok(params) => {
                if let Some(id) = ack {
                    match serde_json::to_value(&params) {
                        Ok(value) => self.hub.send_ack(conn, id, value),
                        Err(e) => self.report(conn, ack, &Error::from(e)),
                    }
                }
            }
            Err(e) => self.report(conn, ack, &Error::Sfu(e.to_string())),
        }
    }

    /// Step 4: client-supplied DTLS parameters finish the transport.
    pub(crate) async fn on_voice_connect_transport(
        &self,
        conn: &ConnectionId,
        transport_id: &str,
        dtls_parameters: DtlsParameters,
        ack: Option<u64>,
    ) {
        let Some(sfu_room) = self.sfu_room_of(conn, ack) else {
            return;
        };
        match sfu_room
            .connect_transport(conn.as_str(), transport_id, dtls_parameters)
            .await
        {
            Ok(()) => {
                if let Some(id) = ack {
                    self.hub.send_ack(conn, id, json!({ "connected": true }));
                }
            }
            Err(e) => self.report(conn, ack, &Error::Sfu(e.to_string())),
        }
    }

    /// Step 5: create the producer, then announce it to every other
    /// room member so they drive their own consume flow.
    pub(crate) async fn on_voice_produce(
        &self,
        conn: &ConnectionId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
        ack: Option<u64>,
    ) {
        let Some(sfu_room) = self.sfu_room_of(conn, ack) else {
            return;
        };
        let producer_id = match sfu_room.produce(conn.as_str(), kind, rtp_parameters).await {
            Ok(id) => id,
            Err(e) => {
                self.report(conn, ack, &Error::Sfu(e.to_string()));
                return;
            }
        };

        if let Some(id) = ack {
            self.hub
                .send_ack(conn, id, json!({ "producerId": producer_id }));
        }

        let Some(room) = self.registry.lookup(conn) else {
            return;
        };
        let guard = room.lock().await;
        let others: Vec<ConnectionId> = guard
            .participants
            .keys()
            .filter(|c| *c != conn)
            .cloned()
            .collect();
        self.hub.send_to_many(
            &others,
            &ServerEvent::VoiceNewProducer {
                connection_id: conn.as_str().to_string(),
                producer_id,
            },
        );
        drop(guard);
    }

    /// Step 6: consumer created paused on the caller's recv transport.
    pub(crate) async fn on_voice_consume(
        &self,
        conn: &ConnectionId,
        producer_id: &str,
        rtp_capabilities: RtpCapabilities,
        ack: Option<u64>,
    ) {
        let Some(sfu_room) = self.sfu_room_of(conn, ack) else {
            return;
        };
        match sfu_room
            .consume(conn.as_str(), producer_id, rtp_capabilities)
            .await
        {
            Ok(params) => {
                if let Some(id) = ack {
                    match serde_json::to_value(&params) {
                        Ok(value) => self.hub.send_ack(conn, id, value),
                        Err(e) => self.report(conn, ack, &Error::from(e)),
                    }
                }
            }
            Err(e) => self.report(conn, ack, &Error::Sfu(e.to_string())),
        }
    }

    /// Step 7: client decoder is ready, start forwarding.
    pub(crate) async fn on_voice_resume_consumer(
        &self,
        conn: &ConnectionId,
        consumer_id: &str,
        ack: Option<u64>,
    ) {
        let Some(sfu_room) = self.sfu_room_of(conn, ack) else {
            return;
        };
        match sfu_room.resume_consumer(conn.as_str(), consumer_id).await {
            Ok(()) => {
                if let Some(id) = ack {
                    self.hub.send_ack(conn, id, json!({ "resumed": true }));
                }
            }
            Err(e) => self.report(conn, ack, &Error::Sfu(e.to_string())),
        }
    }

    /// Step 8: mute/unmute. A paused producer forwards no packets.
    pub(crate) async fn on_voice_set_producer_paused(&self, conn: &ConnectionId, paused: bool) {
        let Some(sfu_room) = self.sfu_room_of(conn, None) else {
            return;
        };
        if let Err(e) = sfu_room.set_producer_paused(conn.as_str(), paused).await {
            self.report(conn, None, &Error::Sfu(e.to_string()));
        }
    }
}
