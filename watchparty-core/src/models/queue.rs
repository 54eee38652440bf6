use serde::{Deserialize, Serialize};

use super::id::generate_id;

/// Maximum queued items per room
pub const QUEUE_CAP: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String, // nanoid(12)
    /// Empty for direct URLs
    pub video_id: String,
    pub video_url: String,
    pub title: String,
    pub added_by: String,
    /// Wall-clock milliseconds
    pub added_at: i64,
}

impl QueueItem {
    #[must_use]
    pub fn new(
        video_id: String,
        video_url: String,
        title: String,
        added_by: String,
        added_at: i64,
    ) -> Self {
        Self {
            id: generate_id(),
            video_id,
            video_url,
            title,
            added_by,
            added_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_item_new() {
        let item = QueueItem::new(
            "dQw4w9WgXcQ".to_string(),
            "https://youtu.be/dQw4w9WgXcQ".to_string(),
            "dQw4w9WgXcQ".to_string(),
            "Alice".to_string(),
            1_000,
        );
        assert_eq!(item.id.len(), 12);
        assert_eq!(item.video_id, "dQw4w9WgXcQ");
    }
}
