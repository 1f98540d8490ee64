//! Post handlers.
//!
//! Mutations are dispatched through the store, so the feed reflects them
//! before the backend answers. Each handler waits for the settlement and
//! reports the confirmed outcome.

use actix_web::{HttpResponse, web};

use pulse_core::domain::RecordId;
use pulse_shared::dto::CreatePostRequest;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let post = state
        .store
        .create_post(&req.content, req.image_url.as_deref(), req.author.as_deref())
        .await?;

    Ok(HttpResponse::Created().json(post))
}

/// GET /api/posts/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<u64>) -> AppResult<HttpResponse> {
    let post_id = RecordId(path.into_inner());

    let post = state
        .store
        .post(post_id)
        .ok_or_else(|| AppError::NotFound(format!("Post with id {} not found", post_id)))?;

    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/posts/{id}
pub async fn delete(state: web::Data<AppState>, path: web::Path<u64>) -> AppResult<HttpResponse> {
    let post_id = RecordId(path.into_inner());

    let dispatch = state.store.delete_post(post_id)?;
    if dispatch.is_ignored() {
        tracing::debug!(%post_id, "Delete already in flight");
        return Ok(HttpResponse::Accepted().finish());
    }
    dispatch.settle().await?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{id}/like
///
/// Toggles the like. A second toggle while one is in flight is ignored and
/// answered with the current optimistic state.
pub async fn toggle_like(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let post_id = RecordId(path.into_inner());

    let dispatch = state.store.toggle_like(post_id)?;
    if dispatch.is_ignored() {
        tracing::debug!(%post_id, "Like already in flight");
    }
    let post = dispatch.settle().await?;

    Ok(HttpResponse::Ok().json(post))
}
