//! SFU room: one audio router plus the participant peer map
//!
//! The peer map is behind a `tokio::sync::Mutex`; router operations
//! (transport creation, produce, consume) run outside the lock so one
//! peer's handshake never blocks the others.

use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroU8};

use mediasoup::prelude::*;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SfuError;
use crate::peer::SfuPeer;
use crate::types::{ClosedPeer, ConsumerParams, ExistingProducer, TransportParams};

/// The single codec every room router registers: Opus, 48 kHz, stereo.
fn audio_codecs() -> Vec<RtpCodecCapability> {
    vec![RtpCodecCapability::Audio {
        mime_type: MimeTypeAudio::Opus,
        preferred_payload_type: None,
        clock_rate: NonZeroU32::new(48000).unwrap(),
        channels: NonZeroU8::new(2).unwrap(),
        parameters: RtpCodecParametersParameters::from([("useinbandfec", 1_u32.into())]),
        rtcp_feedback: vec![RtcpFeedback::TransportCc],
    }]
}

pub struct SfuRoom {
    code: String,
    router: Router,
    webrtc_server: WebRtcServer,
    initial_available_outgoing_bitrate: u32,
    peers: Mutex<HashMap<String, SfuPeer>>,
}

impl SfuRoom {
    pub(crate) async fn new(
        code: String,
        worker: &Worker,
        webrtc_server: WebRtcServer,
        initial_available_outgoing_bitrate: u32,
    ) -> Result<Self, SfuError> {
        let router = worker
            .create_router(RouterOptions::new(audio_codecs()))
            .await
            .map_err(|e| SfuError::Router(e.to_string()))?;

        Ok(Self {
            code,
            router,
            webrtc_server,
            initial_available_outgoing_bitrate,
            peers: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Router RTP capabilities handed to joining clients.
    #[must_use]
    pub fn rtp_capabilities(&self) -> RtpCapabilitiesFinalized {
        self.router.rtp_capabilities().clone()
    }

    /// Create the peer slot if it does not exist yet.
    pub async fn ensure_peer(&self, conn: &str) {
        self.peers
            .lock()
            .await
            .entry(conn.to_string())
            .or_insert_with(SfuPeer::new);
    }

    /// `{connectionId, producerId}` for every *other* peer currently
    /// producing. This is the late-join enumeration.
    pub async fn existing_producers(&self, except: &str) -> Vec<ExistingProducer> {
        self.peers
            .lock()
            .await
            .iter()
            .filter(|(conn, _)| conn.as_str() != except)
            .filter_map(|(conn, peer)| {
                peer.producer.as_ref().map(|producer| ExistingProducer {
                    connection_id: conn.clone(),
                    producer_id: producer.id().to_string(),
                })
            })
            .collect()
    }

    async fn create_transport(&self) -> Result<WebRtcTransport, SfuError> {
        let mut options = WebRtcTransportOptions::new_with_server(self.webrtc_server.clone());
        options.enable_udp = true;
        options.enable_tcp = true;
        options.prefer_udp = true;
        options.initial_available_outgoing_bitrate = self.initial_available_outgoing_bitrate;

        self.router
            .create_webrtc_transport(options)
            .await
            .map_err(|e| SfuError::Transport(e.to_string()))
    }

    /// Create (or recreate) the peer's send transport. A retry replaces
    /// the previous transport, which closes when its handle drops.
    pub async fn create_send_transport(&self, conn: &str) -> Result<TransportParams, SfuError> {
        self.ensure_peer(conn).await;
        let transport = self.create_transport().await?;
        let params = TransportParams::from_transport(&transport);

        let mut peers = self.peers.lock().await;
        let peer = peers
            .get_mut(conn)
            .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
        peer.send_transport = Some(transport);

        debug!(room = %self.code, conn, transport = %params.id, "Send transport created");
        Ok(params)
    }

    /// Create (or recreate) the peer's receive transport.
    pub async fn create_recv_transport(&self, conn: &str) -> Result<TransportParams, SfuError> {
        self.ensure_peer(conn).await;
        let transport = self.create_transport().await?;
        let params = TransportParams::from_transport(&transport);

        let mut peers = self.peers.lock().await;
        let peer = peers
            .get_mut(conn)
            .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
        peer.recv_transport = Some(transport);

        debug!(room = %self.code, conn, transport = %params.id, "Recv transport created");
        Ok(params)
    }

    /// Connect whichever of the peer's transports matches `transport_id`
    /// with the client-supplied DTLS parameters.
    pub async fn connect_transport(
        &self,
        conn: &str,
        transport_id: &str,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), SfuError> {
        let transport = {
            let peers = self.peers.lock().await;
            let peer = peers
                .get(conn)
                .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
            [&peer.send_transport, &peer.recv_transport]
                .into_iter()
                .flatten()
                .find(|t| t.id().to_string() == transport_id)
                .cloned()
                .ok_or_else(|| SfuError::UnknownTransport(transport_id.to_string()))?
        };

        transport
            .connect(WebRtcTransportRemoteParameters { dtls_parameters })
            .await
            .map_err(|e| SfuError::Transport(e.to_string()))?;

        debug!(room = %self.code, conn, transport = transport_id, "Transport connected");
        Ok(())
    }

    /// Create the peer's audio producer on its send transport.
    pub async fn produce(
        &self,
        conn: &str,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<String, SfuError> {
        let transport = {
            let peers = self.peers.lock().await;
            let peer = peers
                .get(conn)
                .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
            peer.send_transport
                .clone()
                .ok_or_else(|| SfuError::NoSendTransport(conn.to_string()))?
        };

        let producer = transport
            .produce(ProducerOptions::new(kind, rtp_parameters))
            .await
            .map_err(|e| SfuError::Produce(e.to_string()))?;
        let producer_id = producer.id().to_string();

        let mut peers = self.peers.lock().await;
        let peer = peers
            .get_mut(conn)
            .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
        peer.producer = Some(producer);

        debug!(room = %self.code, conn, producer = %producer_id, "Producer created");
        Ok(producer_id)
    }

    /// Create a consumer for `producer_id` on the caller's recv
    /// transport. The consumer starts paused; the client resumes it.
    pub async fn consume(
        &self,
        conn: &str,
        producer_id: &str,
        rtp_capabilities: RtpCapabilities,
    ) -> Result<ConsumerParams, SfuError> {
        let (transport, producer) = {
            let peers = self.peers.lock().await;
            let peer = peers
                .get(conn)
                .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
            let transport = peer
                .recv_transport
                .clone()
                .ok_or_else(|| SfuError::NoRecvTransport(conn.to_string()))?;
            let producer = peers
                .values()
                .filter_map(|p| p.producer.as_ref())
                .find(|p| p.id().to_string() == producer_id)
                .cloned()
                .ok_or_else(|| SfuError::UnknownProducer(producer_id.to_string()))?;
            (transport, producer)
        };

        if !self.router.can_consume(&producer.id(), &rtp_capabilities) {
            return Err(SfuError::CannotConsume(producer_id.to_string()));
        }

        let mut options = ConsumerOptions::new(producer.id(), rtp_capabilities);
        options.paused = true;
        let consumer = transport
            .consume(options)
            .await
            .map_err(|e| SfuError::Consume(e.to_string()))?;

        let params = ConsumerParams::from_consumer(&consumer);

        let mut peers = self.peers.lock().await;
        let peer = peers
            .get_mut(conn)
            .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
        peer.consumers.insert(params.id.clone(), consumer);

        debug!(room = %self.code, conn, consumer = %params.id, "Consumer created (paused)");
        Ok(params)
    }

    /// Resume a paused consumer so the client can start decoding.
    pub async fn resume_consumer(&self, conn: &str, consumer_id: &str) -> Result<(), SfuError> {
        let consumer = {
            let peers = self.peers.lock().await;
            let peer = peers
                .get(conn)
                .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
            peer.consumers
                .get(consumer_id)
                .cloned()
                .ok_or_else(|| SfuError::UnknownConsumer(consumer_id.to_string()))?
        };

        consumer
            .resume()
            .await
            .map_err(|e| SfuError::Consume(e.to_string()))
    }

    /// Pause or resume the peer's producer (mute: paused producers
    /// forward nothing).
    pub async fn set_producer_paused(&self, conn: &str, paused: bool) -> Result<(), SfuError> {
        let producer = {
            let peers = self.peers.lock().await;
            let peer = peers
                .get(conn)
                .ok_or_else(|| SfuError::UnknownPeer(conn.to_string()))?;
            peer.producer
                .clone()
                .ok_or_else(|| SfuError::NoProducer(conn.to_string()))?
        };

        let result = if paused {
            producer.pause().await
        } else {
            producer.resume().await
        };
        result.map_err(|e| SfuError::Produce(e.to_string()))
    }

    /// Remove a peer, closing consumers, producer, then transports.
    pub async fn remove_peer(&self, conn: &str) -> Option<ClosedPeer> {
        let peer = self.peers.lock().await.remove(conn)?;
        let producer_id = peer.close();
        debug!(room = %self.code, conn, ?producer_id, "SFU peer closed");
        Some(ClosedPeer { producer_id })
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.lock().await.len()
    }
}
