pub mod oembed;
pub mod playback;
pub mod registry;
pub mod url;

pub use playback::{Transition, ENDED_GUARD_MS, MAX_RATE, MIN_RATE};
pub use registry::{CreatedRoom, JoinedRoom, LeaveOutcome, LobbyRoom, RoomRegistry};
pub use url::VideoSource;
