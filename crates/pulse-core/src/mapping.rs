//! Field mapping between wire records and domain entities.
//!
//! Stateless and pure: the store never sees a snake_case name, the gateway
//! never sees a domain type.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use pulse_shared::{CommentRecord, PostRecord};

use crate::domain::{Comment, CommentId, LikeState, Post, RecordId};
use crate::error::GatewayError;
use crate::ports::{Fields, Record};

/// Author shown when a record carries no username.
pub const ANONYMOUS: &str = "Anonymous";

/// Wire name of the ordering column for both collections.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Wire name of a comment's reference to its post.
pub const POST_ID_FIELD: &str = "post_id";

pub fn decode_post(record: Record) -> Result<Post, GatewayError> {
    let id = record.id;
    let wire: PostRecord = decode_fields(record.fields)?;

    Ok(Post {
        id,
        content: non_empty(wire.content),
        image_url: non_empty(wire.image_url),
        username: non_empty(wire.username).unwrap_or_else(|| ANONYMOUS.to_string()),
        timestamp: resolve_timestamp(wire.timestamp.as_deref(), wire.created_on.as_deref())?,
        like_count: clamp_count(wire.like_count),
        comment_count: clamp_count(wire.comment_count),
        is_liked: wire.is_liked.unwrap_or(false),
    })
}

pub fn decode_comment(record: Record) -> Result<Comment, GatewayError> {
    let id = record.id;
    let wire: CommentRecord = decode_fields(record.fields)?;
    let post_id = wire
        .post_id
        .map(RecordId)
        .ok_or_else(|| GatewayError::Decode(format!("comment {id} has no post_id")))?;

    Ok(Comment {
        id: CommentId::Persisted(id),
        post_id,
        content: wire.content.unwrap_or_default(),
        username: non_empty(wire.username).unwrap_or_else(|| ANONYMOUS.to_string()),
        timestamp: resolve_timestamp(wire.timestamp.as_deref(), wire.created_on.as_deref())?,
    })
}

/// Partial update carrying the like field-group.
pub fn like_patch(state: LikeState) -> Result<Fields, GatewayError> {
    encode_fields(&PostRecord {
        like_count: Some(i64::from(state.like_count)),
        is_liked: Some(state.is_liked),
        ..Default::default()
    })
}

/// Fields for a brand-new post: zero counters, not liked.
pub fn new_post_fields(
    content: &str,
    image_url: Option<&str>,
    username: &str,
    timestamp: DateTime<Utc>,
) -> Result<Fields, GatewayError> {
    encode_fields(&PostRecord {
        name: Some("Post".to_string()),
        content: Some(content.to_string()),
        image_url: Some(image_url.unwrap_or_default().to_string()),
        timestamp: Some(format_timestamp(timestamp)),
        username: Some(username.to_string()),
        like_count: Some(0),
        comment_count: Some(0),
        is_liked: Some(false),
        ..Default::default()
    })
}

/// Fields for creating `comment` on the backend. The local id is not sent.
pub fn new_comment_fields(comment: &Comment) -> Result<Fields, GatewayError> {
    encode_fields(&CommentRecord {
        post_id: Some(comment.post_id.0),
        content: Some(comment.content.clone()),
        timestamp: Some(format_timestamp(comment.timestamp)),
        username: Some(comment.username.clone()),
        ..Default::default()
    })
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn encode_fields<T: Serialize>(wire: &T) -> Result<Fields, GatewayError> {
    match serde_json::to_value(wire) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(GatewayError::Decode(format!("expected an object, got {other}"))),
        Err(e) => Err(GatewayError::Decode(e.to_string())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn clamp_count(value: Option<i64>) -> u32 {
    value
        .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

// Client timestamp first, then the backend's own creation time.
fn resolve_timestamp(
    timestamp: Option<&str>,
    created_on: Option<&str>,
) -> Result<DateTime<Utc>, GatewayError> {
    match timestamp.filter(|s| !s.is_empty()).or(created_on.filter(|s| !s.is_empty())) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| GatewayError::Decode(format!("bad timestamp {raw:?}: {e}"))),
        None => Ok(DateTime::<Utc>::UNIX_EPOCH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64, fields: Value) -> Record {
        match fields {
            Value::Object(fields) => Record {
                id: RecordId(id),
                fields,
            },
            _ => panic!("fields must be an object"),
        }
    }

    #[test]
    fn test_decode_post_applies_defaults() {
        let post = decode_post(record(
            1,
            json!({ "content": "", "CreatedOn": "2024-03-01T10:00:00Z", "like_count": -4 }),
        ))
        .unwrap();

        assert_eq!(post.id, RecordId(1));
        assert_eq!(post.content, None);
        assert_eq!(post.image_url, None);
        assert_eq!(post.username, ANONYMOUS);
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
        assert!(!post.is_liked);
        assert_eq!(post.timestamp.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_decode_post_prefers_client_timestamp() {
        let post = decode_post(record(
            2,
            json!({
                "timestamp": "2024-05-01T08:30:00.000Z",
                "CreatedOn": "2024-05-02T00:00:00Z",
                "username": "alice",
                "like_count": 5,
                "is_liked": true
            }),
        ))
        .unwrap();

        assert_eq!(post.username, "alice");
        assert_eq!(post.like_state(), LikeState { like_count: 5, is_liked: true });
        assert_eq!(format_timestamp(post.timestamp), "2024-05-01T08:30:00.000Z");
    }

    #[test]
    fn test_decode_rejects_garbage_timestamp() {
        let err = decode_post(record(3, json!({ "timestamp": "yesterday" }))).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[test]
    fn test_decode_comment_requires_post_reference() {
        let err = decode_comment(record(9, json!({ "content": "orphan" }))).unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));

        let comment = decode_comment(record(
            42,
            json!({ "content": "hello", "post_id": 1, "timestamp": "2024-01-01T00:00:00Z" }),
        ))
        .unwrap();
        assert_eq!(comment.id, CommentId::Persisted(RecordId(42)));
        assert_eq!(comment.post_id, RecordId(1));
        assert_eq!(comment.username, ANONYMOUS);
    }

    #[test]
    fn test_decode_comment_accepts_textual_post_reference() {
        let comment = decode_comment(record(
            43,
            json!({ "content": "hi", "post_id": "1", "timestamp": "2024-01-01T00:00:00Z" }),
        ))
        .unwrap();

        assert_eq!(comment.post_id, RecordId(1));
    }

    #[test]
    fn test_like_patch_uses_wire_names() {
        let fields = like_patch(LikeState { like_count: 6, is_liked: true }).unwrap();

        assert_eq!(Value::Object(fields), json!({ "like_count": 6, "is_liked": true }));
    }

    #[test]
    fn test_new_comment_fields_drop_local_id() {
        let comment = Comment::provisional(RecordId(1), "hello".to_string(), "Alice".to_string());
        let fields = new_comment_fields(&comment).unwrap();

        assert_eq!(fields.get("post_id"), Some(&json!(1)));
        assert_eq!(fields.get("username"), Some(&json!("Alice")));
        assert!(!fields.contains_key("id"));
    }
}
