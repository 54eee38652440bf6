pub mod chat;
pub mod id;
pub mod participant;
pub mod playback;
pub mod queue;
pub mod room;

pub use chat::{ChatKind, ChatMessage, CHAT_HISTORY_CAP, SYSTEM_AUTHOR};
pub use id::{generate_id, generate_room_code, ConnectionId, ROOM_CODE_LEN};
pub use participant::{Participant, ParticipantInfo, MAX_NAME_LEN};
pub use playback::{VideoSnapshot, VideoState, VideoType};
pub use queue::{QueueItem, QUEUE_CAP};
pub use room::Room;
