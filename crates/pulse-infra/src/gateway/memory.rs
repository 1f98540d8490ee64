//! In-memory gateway - the mock dataset used when no backend is configured.
//!
//! Behaves like the live backend: it assigns ids, stamps `CreatedOn`,
//! filters, orders and pages. Tests can add latency, queue one-shot faults
//! per operation, and count calls.
//! Note: Data is lost on process restart.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use pulse_core::GatewayError;
use pulse_core::domain::RecordId;
use pulse_core::mapping::{POST_ID_FIELD, format_timestamp};
use pulse_core::ports::{Collection, EntityGateway, Fields, ListQuery, Record, SortOrder};

const SEED: &str = include_str!("seed.json");

/// Gateway operation, used to target injected faults and read call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    GetById,
    Create,
    Update,
    Delete,
}

#[derive(Deserialize)]
struct SeedData {
    post: Vec<Record>,
    comment: Vec<Record>,
}

#[derive(Default)]
struct Table {
    rows: BTreeMap<RecordId, Fields>,
    last_id: u64,
}

/// In-memory entity gateway using per-collection maps behind an async RwLock.
pub struct InMemoryGateway {
    tables: RwLock<HashMap<Collection, Table>>,
    latency: Option<Duration>,
    faults: Mutex<HashMap<GatewayOp, VecDeque<GatewayError>>>,
    calls: Mutex<HashMap<GatewayOp, usize>>,
}

impl InMemoryGateway {
    /// Empty gateway.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            latency: None,
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Gateway preloaded with the bundled mock dataset.
    pub fn seeded() -> Result<Self, GatewayError> {
        let seed: SeedData =
            serde_json::from_str(SEED).map_err(|e| GatewayError::Decode(format!("seed dataset: {e}")))?;

        Ok(Self::new()
            .with_records(Collection::Post, seed.post)
            .with_records(Collection::Comment, seed.comment))
    }

    /// Insert records as-is, keeping their ids.
    pub fn with_records(mut self, collection: Collection, records: Vec<Record>) -> Self {
        let table = self.tables.get_mut().entry(collection).or_default();
        for record in records {
            table.last_id = table.last_id.max(record.id.0);
            table.rows.insert(record.id, record.fields);
        }
        self
    }

    /// Delay every call, to mimic network round-trips.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency).filter(|d| !d.is_zero());
        self
    }

    /// Make the next call of `op` fail with `error`. Faults queue up in order.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        lock(&self.faults).entry(op).or_default().push_back(error);
    }

    /// Number of times `op` has been invoked, failed calls included.
    pub fn calls(&self, op: GatewayOp) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    async fn enter(&self, op: GatewayOp) -> Result<(), GatewayError> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let fault = lock(&self.faults).get_mut(&op).and_then(VecDeque::pop_front);
        match fault {
            Some(error) => {
                tracing::debug!(?op, error = %error, "Injected gateway fault");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn validate(collection: Collection, fields: &Fields) -> Result<(), GatewayError> {
        if collection != Collection::Comment {
            return Ok(());
        }

        let has_post = match fields.get(POST_ID_FIELD) {
            Some(Value::Number(_)) => true,
            Some(Value::String(id)) => id.trim().parse::<u64>().is_ok(),
            _ => false,
        };
        if !has_post {
            return Err(GatewayError::Validation("comment requires post_id".to_string()));
        }
        let has_content = fields
            .get("content")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !has_content {
            return Err(GatewayError::Validation("comment requires content".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityGateway for InMemoryGateway {
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, GatewayError> {
        self.enter(GatewayOp::List).await?;

        let tables = self.tables.read().await;
        let mut records: Vec<Record> = tables
            .get(&collection)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|(_, fields)| {
                        query
                            .filter
                            .iter()
                            .all(|f| fields.get(&f.field) == Some(&f.value))
                    })
                    .map(|(id, fields)| Record {
                        id: *id,
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order_by) = &query.order_by {
            records.sort_by(|a, b| {
                let ordering = compare_values(a.fields.get(&order_by.field), b.fields.get(&order_by.field))
                    .then(a.id.cmp(&b.id));
                match order_by.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_by_id(&self, collection: Collection, id: RecordId) -> Result<Option<Record>, GatewayError> {
        self.enter(GatewayOp::GetById).await?;

        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .and_then(|table| table.rows.get(&id))
            .map(|fields| Record {
                id,
                fields: fields.clone(),
            }))
    }

    async fn create(&self, collection: Collection, mut fields: Fields) -> Result<Record, GatewayError> {
        self.enter(GatewayOp::Create).await?;
        Self::validate(collection, &fields)?;

        fields.remove("id");
        fields.insert(
            "CreatedOn".to_string(),
            Value::from(format_timestamp(chrono::Utc::now())),
        );
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        table.last_id += 1;
        let id = RecordId(table.last_id);
        table.rows.insert(id, fields.clone());
        tracing::debug!(%collection, %id, "Record created");

        Ok(Record { id, fields })
    }

    async fn update(&self, collection: Collection, id: RecordId, fields: Fields) -> Result<Record, GatewayError> {
        self.enter(GatewayOp::Update).await?;

        let mut tables = self.tables.write().await;
        let stored = tables
            .get_mut(&collection)
            .and_then(|table| table.rows.get_mut(&id))
            .ok_or(GatewayError::NotFound { collection, id })?;

        for (key, value) in fields {
            if key != "id" {
                stored.insert(key, value);
            }
        }

        Ok(Record {
            id,
            fields: stored.clone(),
        })
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> Result<bool, GatewayError> {
        self.enter(GatewayOp::Delete).await?;

        let mut tables = self.tables.write().await;
        tables
            .get_mut(&collection)
            .and_then(|table| table.rows.remove(&id))
            .map(|_| true)
            .ok_or(GatewayError::NotFound { collection, id })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Missing values sort first. Mixed types compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_seeded_feed_is_newest_first() {
        let gateway = InMemoryGateway::seeded().unwrap();
        let query = ListQuery::new().order_by("timestamp", SortOrder::Desc).page(50, 0);

        let posts = gateway.list(Collection::Post, &query).await.unwrap();
        let ids: Vec<u64> = posts.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let gateway = InMemoryGateway::seeded().unwrap();
        let query = ListQuery::new()
            .where_eq("post_id", 1)
            .order_by("timestamp", SortOrder::Asc)
            .page(1, 1);

        let comments = gateway.list(Collection::Comment, &query).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, RecordId(2));
    }

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let gateway = InMemoryGateway::seeded().unwrap();

        let created = gateway
            .create(
                Collection::Comment,
                fields(json!({ "post_id": 3, "content": "nice run", "id": 1 })),
            )
            .await
            .unwrap();

        assert_eq!(created.id, RecordId(5));
        assert!(created.fields.contains_key("CreatedOn"));
        assert!(!created.fields.contains_key("id"));
    }

    #[tokio::test]
    async fn test_create_comment_requires_content_and_post() {
        let gateway = InMemoryGateway::new();

        let err = gateway
            .create(Collection::Comment, fields(json!({ "post_id": 1, "content": "  " })))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));

        let err = gateway
            .create(Collection::Comment, fields(json!({ "content": "hi" })))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_merges_and_missing_record_is_not_found() {
        let gateway = InMemoryGateway::seeded().unwrap();

        let updated = gateway
            .update(Collection::Post, RecordId(3), fields(json!({ "like_count": 35, "is_liked": true })))
            .await
            .unwrap();
        assert_eq!(updated.fields.get("like_count"), Some(&json!(35)));
        assert_eq!(updated.fields.get("username"), Some(&json!("ridge_runner")));

        let err = gateway
            .update(Collection::Post, RecordId(999), Fields::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::NotFound {
                collection: Collection::Post,
                id: RecordId(999)
            }
        );
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_none() {
        let gateway = InMemoryGateway::seeded().unwrap();

        assert!(gateway.delete(Collection::Post, RecordId(5)).await.unwrap());
        assert_eq!(gateway.get_by_id(Collection::Post, RecordId(5)).await.unwrap(), None);
        assert!(gateway.delete(Collection::Post, RecordId(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once() {
        let gateway = InMemoryGateway::seeded().unwrap();
        gateway.fail_next(GatewayOp::GetById, GatewayError::Transport("offline".to_string()));

        assert!(gateway.get_by_id(Collection::Post, RecordId(1)).await.is_err());
        assert!(gateway.get_by_id(Collection::Post, RecordId(1)).await.unwrap().is_some());
        assert_eq!(gateway.calls(GatewayOp::GetById), 2);
        assert_eq!(gateway.calls(GatewayOp::Update), 0);
    }
}
