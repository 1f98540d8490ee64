//! Optimistic store - the client's in-memory feed and the only path to the gateway.
//!
//! Every mutation follows the same cycle: apply locally while holding the
//! state lock, mark its field-group pending, persist in a background task,
//! then confirm or roll back. Reads never wait on the gateway.
//!
//! Each successful reload bumps a generation counter. A settlement that
//! started under an older generation still applies confirmed values, but a
//! failed one leaves the reloaded counters and flags alone: they are newer
//! than the snapshot it would restore.

mod dispatch;
mod pending;
mod snapshot;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::watch;

use crate::domain::{Comment, CommentId, LikeState, Post, RecordId};
use crate::error::{DomainError, GatewayError};
use crate::mapping::{self, POST_ID_FIELD, TIMESTAMP_FIELD};
use crate::ports::{Collection, EntityGateway, ListQuery, SortOrder};

pub use dispatch::{Dispatch, InFlight, Settlement};
pub use pending::{FieldGroup, Operation};
pub use snapshot::{FeedSnapshot, LoadPhase};

use pending::{PendingSet, Ticket};

/// Store tuning.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Posts fetched per feed load.
    pub page_size: u32,
    /// Comments fetched per post.
    pub comment_page_size: u32,
    /// Author used when the UI does not name one.
    pub default_author: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            comment_page_size: 100,
            default_author: "You".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct FeedState {
    posts: HashMap<RecordId, Post>,
    comments: HashMap<CommentId, Comment>,
    pending: PendingSet,
    generation: u64,
    revision: u64,
    phase: LoadPhase,
    load_error: Option<String>,
}

impl FeedState {
    fn sorted_posts(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        posts
    }

    fn comments_for(&self, post_id: RecordId) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.timestamp, c.is_provisional()));
        comments
    }

    /// A like or a comment on the post is still waiting for the gateway.
    fn has_unsettled_changes(&self, post_id: RecordId) -> bool {
        self.pending.contains(&FieldGroup::Like(post_id))
            || self
                .comments
                .values()
                .any(|c| c.post_id == post_id && self.pending.contains(&FieldGroup::CommentInsert(c.id)))
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            revision: self.revision,
            phase: self.phase,
            posts: self.sorted_posts(),
            pending: self.pending.len(),
            load_error: self.load_error.clone(),
        }
    }
}

struct Inner {
    gateway: Arc<dyn EntityGateway>,
    config: StoreConfig,
    state: Mutex<FeedState>,
    updates: watch::Sender<FeedSnapshot>,
}

/// Handle to one session's feed. Clones share the same state.
#[derive(Clone)]
pub struct OptimisticStore {
    inner: Arc<Inner>,
}

impl OptimisticStore {
    /// Create an empty store. Call [`load_all`](Self::load_all) to populate it.
    pub fn new(gateway: Arc<dyn EntityGateway>, config: StoreConfig) -> Self {
        let (updates, _) = watch::channel(FeedSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                config,
                state: Mutex::new(FeedState::default()),
                updates,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ---- reads ----

    pub fn snapshot(&self) -> FeedSnapshot {
        self.lock().snapshot()
    }

    /// Receive a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.updates.subscribe()
    }

    pub fn post(&self, post_id: RecordId) -> Option<Post> {
        self.lock().posts.get(&post_id).cloned()
    }

    /// Posts newest first.
    pub fn posts(&self) -> Vec<Post> {
        self.lock().sorted_posts()
    }

    /// Comments of a post, oldest first, provisional ones included.
    pub fn comments_for(&self, post_id: RecordId) -> Vec<Comment> {
        self.lock().comments_for(post_id)
    }

    pub fn is_pending(&self, group: FieldGroup) -> bool {
        self.lock().pending.contains(&group)
    }

    pub fn is_like_pending(&self, post_id: RecordId) -> bool {
        self.is_pending(FieldGroup::Like(post_id))
    }

    // ---- loading ----

    /// Replace every post with the gateway's first page.
    ///
    /// On failure the current posts stay available and `LoadFailure` is returned.
    pub async fn load_all(&self) -> Result<usize, DomainError> {
        self.reload(LoadPhase::Loading).await
    }

    /// Same reconciliation as [`load_all`](Self::load_all), flagged as a user pull.
    pub async fn refresh(&self) -> Result<usize, DomainError> {
        self.reload(LoadPhase::Refreshing).await
    }

    async fn reload(&self, phase: LoadPhase) -> Result<usize, DomainError> {
        {
            let mut state = self.lock();
            state.phase = phase;
            self.commit(&mut state);
        }

        let query = ListQuery::new()
            .order_by(TIMESTAMP_FIELD, SortOrder::Desc)
            .page(self.inner.config.page_size, 0);
        let result = self.inner.gateway.list(Collection::Post, &query).await;

        let mut guard = self.lock();
        let state = &mut *guard;
        state.phase = LoadPhase::Idle;

        match result {
            Ok(records) => {
                state.posts = records
                    .into_iter()
                    .filter_map(|record| {
                        let id = record.id;
                        mapping::decode_post(record)
                            .map_err(|e| {
                                tracing::warn!(post_id = %id, error = %e, "Skipping malformed post record");
                            })
                            .ok()
                    })
                    .map(|post| (post.id, post))
                    .collect();
                state.generation += 1;
                state.load_error = None;
                self.commit(state);

                tracing::info!(
                    posts = state.posts.len(),
                    generation = state.generation,
                    ?phase,
                    "Feed reconciled"
                );
                Ok(state.posts.len())
            }
            Err(source) => {
                state.load_error = Some(source.to_string());
                self.commit(state);

                tracing::warn!(
                    error = %source,
                    kept = state.posts.len(),
                    ?phase,
                    "Feed load failed, keeping current posts"
                );
                Err(DomainError::LoadFailure {
                    collection: Collection::Post,
                    source,
                })
            }
        }
    }

    /// Fetch the comments of one post, replacing its confirmed comments.
    pub async fn load_comments(&self, post_id: RecordId) -> Result<Vec<Comment>, DomainError> {
        let query = ListQuery::new()
            .where_eq(POST_ID_FIELD, post_id.0)
            .order_by(TIMESTAMP_FIELD, SortOrder::Asc)
            .page(self.inner.config.comment_page_size, 0);

        let records = self
            .inner
            .gateway
            .list(Collection::Comment, &query)
            .await
            .map_err(|source| {
                tracing::warn!(post_id = %post_id, error = %source, "Comment load failed");
                DomainError::LoadFailure {
                    collection: Collection::Comment,
                    source,
                }
            })?;

        let fetched: Vec<Comment> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                mapping::decode_comment(record)
                    .map_err(|e| {
                        tracing::warn!(comment_id = %id, error = %e, "Skipping malformed comment record");
                    })
                    .ok()
            })
            .filter(|c| c.post_id == post_id)
            .collect();

        let mut guard = self.lock();
        let state = &mut *guard;
        state
            .comments
            .retain(|_, c| c.post_id != post_id || c.is_provisional());
        for comment in fetched {
            state.comments.insert(comment.id, comment);
        }
        self.commit(state);

        Ok(state.comments_for(post_id))
    }

    // ---- optimistic mutations ----

    /// Flip the viewer's like on a post.
    ///
    /// A second toggle while the first is still pending is ignored and
    /// returns the post as it currently reads.
    pub fn toggle_like(&self, post_id: RecordId) -> Result<Dispatch<Post>, DomainError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(post) = state.posts.get_mut(&post_id) else {
            return Err(DomainError::post_not_found(post_id));
        };
        let Some(ticket) = state.pending.begin(FieldGroup::Like(post_id), state.generation) else {
            tracing::debug!(post_id = %post_id, "Like already pending, ignoring toggle");
            return Ok(Dispatch::Ignored(post.clone()));
        };

        let before = post.like_state();
        let after = before.toggled();
        post.apply_like_state(after);
        let optimistic = post.clone();
        self.commit(state);
        drop(guard);

        tracing::debug!(
            post_id = %post_id,
            like_count = after.like_count,
            is_liked = after.is_liked,
            "Like applied optimistically"
        );

        let store = self.clone();
        let fallback = optimistic.clone();
        let handle = tokio::spawn(async move {
            store
                .persist_like(ticket, post_id, before, after, fallback)
                .await
        });

        Ok(Dispatch::InFlight(InFlight {
            optimistic,
            settlement: Settlement::new(handle),
        }))
    }

    async fn persist_like(
        self,
        ticket: Ticket,
        post_id: RecordId,
        before: LikeState,
        after: LikeState,
        optimistic: Post,
    ) -> Result<Post, DomainError> {
        let result = match mapping::like_patch(after) {
            Ok(fields) => {
                self.inner
                    .gateway
                    .update(Collection::Post, post_id, fields)
                    .await
            }
            Err(e) => Err(e),
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        state.pending.settle(&ticket);

        let outcome = match result {
            Ok(record) => {
                match mapping::decode_post(record) {
                    Ok(confirmed) => {
                        if let Some(post) = state.posts.get_mut(&post_id) {
                            post.apply_like_state(confirmed.like_state());
                        }
                    }
                    Err(e) => {
                        tracing::warn!(post_id = %post_id, error = %e, "Unreadable update response, keeping optimistic like");
                    }
                }
                tracing::debug!(post_id = %post_id, "Like confirmed");
                Ok(state.posts.get(&post_id).cloned().unwrap_or(optimistic))
            }
            Err(source) => {
                if ticket.generation == state.generation {
                    if let Some(post) = state.posts.get_mut(&post_id) {
                        post.apply_like_state(before);
                    }
                } else {
                    tracing::debug!(post_id = %post_id, "Feed reloaded while like was in flight, skipping rollback");
                }
                tracing::warn!(post_id = %post_id, error = %source, "Like failed, rolled back");
                Err(DomainError::MutationFailure {
                    operation: Operation::Like,
                    post_id: Some(post_id),
                    source,
                })
            }
        };

        self.commit(state);
        outcome
    }

    /// Append a comment to a post before the gateway has seen it.
    pub fn add_comment(
        &self,
        post_id: RecordId,
        content: &str,
        author: Option<&str>,
    ) -> Result<InFlight<Comment>, DomainError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::Validation(
                "comment content must not be empty".to_string(),
            ));
        }
        let username = self.author_or_default(author);

        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(post) = state.posts.get_mut(&post_id) else {
            return Err(DomainError::post_not_found(post_id));
        };

        let comment = Comment::provisional(post_id, content.to_string(), username);
        let Some(ticket) = state
            .pending
            .begin(FieldGroup::CommentInsert(comment.id), state.generation)
        else {
            return Err(DomainError::Internal(format!(
                "provisional comment id {} already in use",
                comment.id
            )));
        };
        post.comment_count = post.comment_count.saturating_add(1);
        state.comments.insert(comment.id, comment.clone());
        self.commit(state);
        drop(guard);

        tracing::debug!(post_id = %post_id, comment_id = %comment.id, "Comment applied optimistically");

        let store = self.clone();
        let provisional = comment.clone();
        let handle = tokio::spawn(async move { store.persist_comment(ticket, provisional).await });

        Ok(InFlight {
            optimistic: comment,
            settlement: Settlement::new(handle),
        })
    }

    async fn persist_comment(self, ticket: Ticket, provisional: Comment) -> Result<Comment, DomainError> {
        let result = match mapping::new_comment_fields(&provisional) {
            Ok(fields) => self.inner.gateway.create(Collection::Comment, fields).await,
            Err(e) => Err(e),
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        state.pending.settle(&ticket);

        let post_id = provisional.post_id;
        let provisional_id = provisional.id;
        let outcome = match result {
            Ok(record) => {
                let confirmed_id = CommentId::Persisted(record.id);
                let mut comment = state
                    .comments
                    .remove(&provisional_id)
                    .unwrap_or(provisional);
                comment.id = confirmed_id;
                state.comments.insert(confirmed_id, comment.clone());

                tracing::debug!(post_id = %post_id, comment_id = %confirmed_id, "Comment confirmed");
                Ok(comment)
            }
            Err(source) => {
                state.comments.remove(&provisional_id);
                if ticket.generation == state.generation {
                    if let Some(post) = state.posts.get_mut(&post_id) {
                        post.comment_count = post.comment_count.saturating_sub(1);
                    }
                }
                tracing::warn!(post_id = %post_id, error = %source, "Comment failed, rolled back");
                Err(DomainError::MutationFailure {
                    operation: Operation::Comment,
                    post_id: Some(post_id),
                    source,
                })
            }
        };

        self.commit(state);
        outcome
    }

    /// Remove a post locally, then delete it on the gateway.
    ///
    /// Its comments are left untouched. Ignored while the post is already
    /// being deleted or a like or comment on it has not settled.
    pub fn delete_post(&self, post_id: RecordId) -> Result<Dispatch<Post>, DomainError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(post) = state.posts.get(&post_id) else {
            return Err(DomainError::post_not_found(post_id));
        };
        // The restore copy must not carry an unsettled like or comment count.
        if state.has_unsettled_changes(post_id) {
            tracing::debug!(post_id = %post_id, "Post has unsettled changes, ignoring delete");
            return Ok(Dispatch::Ignored(post.clone()));
        }
        let Some(ticket) = state
            .pending
            .begin(FieldGroup::PostRemoval(post_id), state.generation)
        else {
            tracing::debug!(post_id = %post_id, "Deletion already pending, ignoring");
            return Ok(Dispatch::Ignored(post.clone()));
        };

        let removed = post.clone();
        state.posts.remove(&post_id);
        self.commit(state);
        drop(guard);

        tracing::debug!(post_id = %post_id, "Post removed optimistically");

        let store = self.clone();
        let restore = removed.clone();
        let handle = tokio::spawn(async move { store.persist_delete(ticket, restore).await });

        Ok(Dispatch::InFlight(InFlight {
            optimistic: removed,
            settlement: Settlement::new(handle),
        }))
    }

    async fn persist_delete(self, ticket: Ticket, removed: Post) -> Result<Post, DomainError> {
        let post_id = removed.id;
        let result = match self.inner.gateway.delete(Collection::Post, post_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GatewayError::Validation(format!(
                "backend did not delete post {post_id}"
            ))),
            Err(e) => Err(e),
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        state.pending.settle(&ticket);

        let outcome = match result {
            Ok(()) => {
                // A reload may have brought it back before the delete landed.
                state.posts.remove(&post_id);
                tracing::info!(post_id = %post_id, "Post deleted");
                Ok(removed)
            }
            Err(source) => {
                if ticket.generation == state.generation {
                    state.posts.entry(post_id).or_insert(removed);
                }
                tracing::warn!(post_id = %post_id, error = %source, "Delete failed, rolled back");
                Err(DomainError::MutationFailure {
                    operation: Operation::DeletePost,
                    post_id: Some(post_id),
                    source,
                })
            }
        };

        self.commit(state);
        outcome
    }

    // ---- pessimistic creation ----

    /// Publish a post. It enters the feed once the gateway has assigned its id.
    pub async fn create_post(
        &self,
        content: &str,
        image_url: Option<&str>,
        author: Option<&str>,
    ) -> Result<Post, DomainError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::Validation(
                "post content must not be empty".to_string(),
            ));
        }
        let username = self.author_or_default(author);
        let image_url = image_url.map(str::trim).filter(|url| !url.is_empty());

        let failure = |source: GatewayError| {
            tracing::warn!(error = %source, "Post creation failed");
            DomainError::MutationFailure {
                operation: Operation::CreatePost,
                post_id: None,
                source,
            }
        };

        let fields = mapping::new_post_fields(content, image_url, &username, Utc::now()).map_err(failure)?;
        let record = self
            .inner
            .gateway
            .create(Collection::Post, fields)
            .await
            .map_err(failure)?;
        let post = mapping::decode_post(record).map_err(failure)?;

        let mut state = self.lock();
        state.posts.insert(post.id, post.clone());
        self.commit(&mut state);

        tracing::info!(post_id = %post.id, "Post created");
        Ok(post)
    }

    // ---- internals ----

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish the state as a new revision.
    fn commit(&self, state: &mut FeedState) {
        state.revision += 1;
        self.inner.updates.send_replace(state.snapshot());
    }

    fn author_or_default(&self, author: Option<&str>) -> String {
        author
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.inner.config.default_author)
            .to_string()
    }
}
