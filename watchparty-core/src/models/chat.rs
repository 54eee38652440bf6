use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::participant::Participant;

/// Author ID used for dispatcher-injected messages
pub const SYSTEM_AUTHOR: &str = "system";

/// Maximum messages retained per room; oldest are dropped on overflow
pub const CHAT_HISTORY_CAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Message,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String, // nanoid(12)
    pub author_id: String,
    pub author_name: String,
    pub avatar: String,
    pub content: String,
    /// Wall-clock milliseconds
    pub timestamp: i64,
    pub kind: ChatKind,
}

impl ChatMessage {
    #[must_use]
    pub fn user(author: &Participant, content: String, timestamp: i64) -> Self {
        Self {
            id: generate_id(),
            author_id: author.id.as_str().to_string(),
            author_name: author.name.clone(),
            avatar: author.avatar.clone(),
            content,
            timestamp,
            kind: ChatKind::Message,
        }
    }

    #[must_use]
    pub fn system(content: String, timestamp: i64) -> Self {
        Self {
            id: generate_id(),
            author_id: SYSTEM_AUTHOR.to_string(),
            author_name: SYSTEM_AUTHOR.to_string(),
            avatar: String::new(),
            content,
            timestamp,
            kind: ChatKind::System,
        }
    }
}
