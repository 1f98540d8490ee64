//! Entity gateway port - the CRUD boundary in front of the feed backend.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::RecordId;
use crate::error::GatewayError;

/// Persisted fields of a record, keyed by their wire (snake_case) names.
pub type Fields = Map<String, Value>;

/// Named entity collection on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Post,
    Comment,
}

impl Collection {
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Post => "post",
            Collection::Comment => "comment",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A record as the gateway returns it: its id plus wire fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

/// Exact-match condition on a wire field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Query options for [`EntityGateway::list`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            order,
        });
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Entity gateway trait - abstraction over the feed backend (live API, mock dataset).
#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// List records of a collection.
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, GatewayError>;

    /// Fetch a single record, `None` if it does not exist.
    async fn get_by_id(&self, collection: Collection, id: RecordId) -> Result<Option<Record>, GatewayError>;

    /// Create a record; the gateway assigns its id.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<Record, GatewayError>;

    /// Merge `fields` into an existing record and return the result.
    async fn update(&self, collection: Collection, id: RecordId, fields: Fields) -> Result<Record, GatewayError>;

    /// Delete a record.
    async fn delete(&self, collection: Collection, id: RecordId) -> Result<bool, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flattens_fields_next_to_id() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "id": 7,
            "content": "hello",
            "like_count": 2
        }))
        .unwrap();

        assert_eq!(record.id, RecordId(7));
        assert_eq!(record.fields.get("content"), Some(&Value::from("hello")));
        assert!(!record.fields.contains_key("id"));
    }

    #[test]
    fn test_list_query_builder() {
        let query = ListQuery::new()
            .where_eq("post_id", 3)
            .order_by("timestamp", SortOrder::Asc)
            .page(100, 0);

        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "filter": [{ "field": "post_id", "value": 3 }],
                "order_by": { "field": "timestamp", "order": "asc" },
                "limit": 100,
                "offset": 0
            })
        );
    }
}
