use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ConnectionId;

/// Maximum display-name length after trimming
pub const MAX_NAME_LEN: usize = 20;

/// Names handed out when a client joins without one
const FALLBACK_NAMES: [&str; 12] = [
    "Otter", "Lynx", "Falcon", "Panda", "Koala", "Marmot", "Heron", "Badger", "Gecko", "Puffin",
    "Civet", "Wombat",
];

const AVATARS: [&str; 16] = [
    "\u{1F98A}", // fox
    "\u{1F43C}", // panda
    "\u{1F428}", // koala
    "\u{1F981}", // lion
    "\u{1F42F}", // tiger
    "\u{1F435}", // monkey
    "\u{1F427}", // penguin
    "\u{1F989}", // owl
    "\u{1F438}", // frog
    "\u{1F419}", // octopus
    "\u{1F42C}", // dolphin
    "\u{1F422}", // turtle
    "\u{1F984}", // unicorn
    "\u{1F43B}", // bear
    "\u{1F424}", // chick
    "\u{1F994}", // hedgehog
];

/// One connection inside one room.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ConnectionId,
    pub name: String,
    pub avatar: String,
    /// Monotonic per-room counter used to break host-transfer ties
    pub join_seq: u64,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    #[must_use]
    pub fn new(id: ConnectionId, requested_name: &str, join_seq: u64) -> Self {
        let name = sanitize_name(requested_name, join_seq);
        let avatar = avatar_for(&name).to_string();
        Self {
            id,
            name,
            avatar,
            join_seq,
            joined_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.as_str().to_string(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Wire-facing participant summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

/// Trim and cap a requested display name; empty names draw from a fixed
/// pool keyed by the join counter so two anonymous joiners differ.
#[must_use]
pub fn sanitize_name(raw: &str, fallback_seed: u64) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FALLBACK_NAMES[(fallback_seed as usize) % FALLBACK_NAMES.len()].to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

/// Deterministic avatar emoji for a display name (FNV-1a over the bytes).
#[must_use]
pub fn avatar_for(name: &str) -> &'static str {
    let hash = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        });
    AVATARS[(hash as usize) % AVATARS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_trimmed_and_capped() {
        let p = Participant::new(ConnectionId::new(), "  Alice  ", 0);
        assert_eq!(p.name, "Alice");

        let long = "x".repeat(50);
        let p = Participant::new(ConnectionId::new(), &long, 0);
        assert_eq!(p.name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_empty_name_gets_fallback() {
        let p0 = Participant::new(ConnectionId::new(), "", 0);
        let p1 = Participant::new(ConnectionId::new(), "   ", 1);
        assert!(!p0.name.is_empty());
        assert!(!p1.name.is_empty());
        assert_ne!(p0.name, p1.name);
    }

    #[test]
    fn test_avatar_deterministic() {
        assert_eq!(avatar_for("Alice"), avatar_for("Alice"));
        let p1 = Participant::new(ConnectionId::new(), "Bob", 0);
        let p2 = Participant::new(ConnectionId::new(), "Bob", 5);
        assert_eq!(p1.avatar, p2.avatar);
    }
}
