use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// Post entity - a shareable feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: RecordId,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub like_count: u32,
    pub comment_count: u32,
    /// Whether the current viewer likes this post.
    pub is_liked: bool,
}

/// The like field-group of a post. Count and flag only ever move together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub like_count: u32,
    pub is_liked: bool,
}

impl LikeState {
    /// The state after the viewer flips their like.
    ///
    /// Unliking saturates at zero; a liked post always has a count of at least one.
    pub fn toggled(self) -> Self {
        if self.is_liked {
            Self {
                like_count: self.like_count.saturating_sub(1),
                is_liked: false,
            }
        } else {
            Self {
                like_count: self.like_count.saturating_add(1),
                is_liked: true,
            }
        }
    }
}

impl Post {
    pub fn like_state(&self) -> LikeState {
        LikeState {
            like_count: self.like_count,
            is_liked: self.is_liked,
        }
    }

    pub fn apply_like_state(&mut self, state: LikeState) {
        self.like_count = state.like_count;
        self.is_liked = state.is_liked;
    }
}
