use serde::Serialize;

use crate::domain::Post;

/// What the feed is currently doing, so the UI can pick its loading indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Idle,
    /// Initial load - the UI shows a skeleton.
    Loading,
    /// User-initiated pull - the UI keeps the feed and shows a spinner.
    Refreshing,
}

/// Read-only view of the store published to subscribers on every change.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    /// Increases by one with every published change.
    pub revision: u64,
    pub phase: LoadPhase,
    /// Posts sorted by timestamp, newest first.
    pub posts: Vec<Post>,
    /// Number of field-groups currently pending.
    pub pending: usize,
    /// Reason the last load failed, cleared by the next successful one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}
