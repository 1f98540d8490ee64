//! Wire records - the snake_case shape the feed backend persists.
//!
//! Every field is optional: the backend omits unset columns and the same
//! struct doubles as a partial update payload.

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

/// A row of the `post` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Display name of the record, a system column on the backend.
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// RFC 3339 creation time written by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// RFC 3339 creation time stamped by the backend.
    #[serde(rename = "CreatedOn", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

/// A row of the `comment` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stored as text by some backends, so both `1` and `"1"` are accepted.
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub post_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "CreatedOn", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&text), &"a numeric id")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_post_record_only_serializes_set_fields() {
        let patch = PostRecord {
            like_count: Some(6),
            is_liked: Some(true),
            ..Default::default()
        };

        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({ "like_count": 6, "is_liked": true }));
    }

    #[test]
    fn test_post_record_ignores_unknown_columns() {
        let record: PostRecord = serde_json::from_value(serde_json::json!({
            "content": "hi",
            "Owner": "someone",
            "Tags": "",
            "CreatedOn": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.content.as_deref(), Some("hi"));
        assert_eq!(record.created_on.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(record.like_count, None);
    }

    #[test]
    fn test_comment_post_id_accepts_number_or_text() {
        let numeric: CommentRecord = serde_json::from_value(serde_json::json!({ "post_id": 7 })).unwrap();
        let textual: CommentRecord = serde_json::from_value(serde_json::json!({ "post_id": "7" })).unwrap();
        let blank: CommentRecord = serde_json::from_value(serde_json::json!({ "post_id": "" })).unwrap();

        assert_eq!(numeric.post_id, Some(7));
        assert_eq!(textual.post_id, Some(7));
        assert_eq!(blank.post_id, None);
        assert!(serde_json::from_value::<CommentRecord>(serde_json::json!({ "post_id": "abc" })).is_err());
    }
}
