//! Watch-party SFU (Selective Forwarding Unit) control plane
//!
//! The media plane is delegated to the embedded `mediasoup` library; this
//! crate implements the control surface on top of it:
//!
//! - **`SfuManager`**: worker pool (one `WebRtcServer` per worker),
//!   round-robin room→worker assignment, room registry
//! - **`SfuRoom`**: one audio router plus the per-participant peer map
//! - **`SfuPeer`**: send/recv transports, one optional audio producer,
//!   consumers keyed by ID
//!
//! Every state transition is client-driven through the room's methods;
//! nothing is created speculatively, so a failed handshake step can be
//! retried from that step.

mod config;
mod error;
mod manager;
mod peer;
mod room;
mod types;

pub use config::SfuConfig;
pub use error::SfuError;
pub use manager::SfuManager;
pub use peer::SfuPeer;
pub use room::SfuRoom;
pub use types::{ClosedPeer, ConsumerParams, ExistingProducer, TransportParams};
