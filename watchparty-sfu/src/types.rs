//! Wire-facing parameter structs returned from handshake steps

use mediasoup::prelude::*;
use serde::Serialize;

/// Reply payload for `voice:create-send-transport` / `voice:create-recv-transport`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportParams {
    pub id: String,
    pub ice_parameters: IceParameters,
    pub ice_candidates: Vec<IceCandidate>,
    pub dtls_parameters: DtlsParameters,
}

impl TransportParams {
    pub(crate) fn from_transport(transport: &WebRtcTransport) -> Self {
        Self {
            id: transport.id().to_string(),
            ice_parameters: transport.ice_parameters().clone(),
            ice_candidates: transport.ice_candidates().clone(),
            dtls_parameters: transport.dtls_parameters().clone(),
        }
    }
}

/// One entry of the `voice:join` ack's producer enumeration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingProducer {
    pub connection_id: String,
    pub producer_id: String,
}

/// Reply payload for `voice:consume`. The consumer starts paused; the
/// client resumes it once its decoder is wired up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerParams {
    pub id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

impl ConsumerParams {
    pub(crate) fn from_consumer(consumer: &Consumer) -> Self {
        Self {
            id: consumer.id().to_string(),
            producer_id: consumer.producer_id().to_string(),
            kind: consumer.kind(),
            rtp_parameters: consumer.rtp_parameters().clone(),
        }
    }
}

/// What was torn down when a peer left voice.
#[derive(Debug, Clone, Default)]
pub struct ClosedPeer {
    /// Producer that was closed, if the peer had one; drives the
    /// `voice:producer-closed` fanout so remote consumers get torn down.
    pub producer_id: Option<String>,
}
