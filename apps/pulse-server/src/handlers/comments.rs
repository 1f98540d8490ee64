//! Comment handlers.

use actix_web::{HttpResponse, web};

use pulse_core::domain::RecordId;
use pulse_shared::dto::CreateCommentRequest;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts/{id}/comments
pub async fn list(state: web::Data<AppState>, path: web::Path<u64>) -> AppResult<HttpResponse> {
    let post_id = RecordId(path.into_inner());
    let comments = state.store.load_comments(post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/posts/{id}/comments
pub async fn create(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let post_id = RecordId(path.into_inner());
    let req = body.into_inner();

    let in_flight = state
        .store
        .add_comment(post_id, &req.content, req.author.as_deref())?;
    tracing::debug!(%post_id, provisional_id = %in_flight.optimistic.id, "Comment dispatched");

    let comment = in_flight.settlement.await?;
    Ok(HttpResponse::Created().json(comment))
}
