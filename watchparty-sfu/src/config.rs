//! SFU configuration

use std::net::{IpAddr, Ipv4Addr};

use mediasoup::prelude::*;

/// SFU configuration
#[derive(Debug, Clone)]
pub struct SfuConfig {
    /// Number of mediasoup workers spawned at startup
    pub num_workers: usize,
    /// Local address the WebRTC servers bind to
    pub listen_ip: IpAddr,
    /// Public address advertised in ICE candidates
    pub announced_ip: Option<String>,
    /// Base port; worker i listens on `port + i` (UDP and TCP)
    pub port: u16,
    /// Initial outgoing bitrate estimate for new transports (bps)
    pub initial_available_outgoing_bitrate: u32,
}

impl Default for SfuConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            announced_ip: None,
            port: 40000,
            initial_available_outgoing_bitrate: 600_000,
        }
    }
}

impl SfuConfig {
    /// Single construction point for listen infos so the bind/announce
    /// policy stays in one place.
    pub(crate) fn listen_info(&self, protocol: Protocol, port: u16) -> ListenInfo {
        ListenInfo {
            protocol,
            ip: self.listen_ip,
            announced_address: self.announced_ip.clone(),
            expose_internal_ip: false,
            port: Some(port),
            port_range: None,
            flags: None,
            send_buffer_size: None,
            recv_buffer_size: None,
        }
    }
}
