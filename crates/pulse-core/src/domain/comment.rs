use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, RecordId};

/// Comment entity - refers to its post by id only.
///
/// Deleting the post leaves its comments in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: RecordId,
    pub content: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

impl Comment {
    /// Create a local comment awaiting confirmation from the gateway.
    pub fn provisional(post_id: RecordId, content: String, username: String) -> Self {
        Self {
            id: CommentId::provisional(),
            post_id,
            content,
            username,
            timestamp: Utc::now(),
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }
}
