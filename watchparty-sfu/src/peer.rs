//! SFU peer: one participant's transports, producer and consumers

use std::collections::HashMap;

use mediasoup::prelude::*;

/// Per-participant SFU state. Either transport may be `None` while the
/// client is still setting it up.
pub struct SfuPeer {
    pub(crate) send_transport: Option<WebRtcTransport>,
    pub(crate) recv_transport: Option<WebRtcTransport>,
    pub(crate) producer: Option<Producer>,
    pub(crate) consumers: HashMap<String, Consumer>,
}

impl SfuPeer {
    pub(crate) fn new() -> Self {
        Self {
            send_transport: None,
            recv_transport: None,
            producer: None,
            consumers: HashMap::new(),
        }
    }

    /// Tear everything down: consumers first, then the producer, then
    /// both transports. Entities close when their last handle drops.
    /// Returns the closed producer's ID for the close-propagation fanout.
    pub(crate) fn close(mut self) -> Option<String> {
        self.consumers.clear();
        let producer_id = self.producer.take().map(|p| p.id().to_string());
        self.send_transport.take();
        self.recv_transport.take();
        producer_id
    }

    #[must_use]
    pub fn has_producer(&self) -> bool {
        self.producer.is_some()
    }

    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }
}
