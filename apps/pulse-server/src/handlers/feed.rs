//! Feed handlers: snapshot, refresh and the live update stream.

use std::convert::Infallible;

use actix_web::{HttpResponse, web};
use actix_web::web::Bytes;
use futures::stream;
use pulse_core::store::FeedSnapshot;
use pulse_shared::ApiResponse;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/feed
pub async fn get_feed(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.store.snapshot())
}

/// POST /api/feed/refresh
pub async fn refresh(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let loaded = state.store.refresh().await?;
    tracing::debug!(loaded, "Feed refreshed on request");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(state.store.snapshot())))
}

/// GET /api/feed/stream
///
/// Server-sent events, one `feed` event per published snapshot. The current
/// snapshot is sent first.
pub async fn stream(state: web::Data<AppState>) -> HttpResponse {
    let rx = state.store.subscribe();

    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let frame = encode_event(&rx.borrow_and_update());
        Some((Ok::<_, Infallible>(frame), (rx, false)))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events)
}

fn encode_event(snapshot: &FeedSnapshot) -> Bytes {
    match serde_json::to_string(snapshot) {
        Ok(json) => Bytes::from(format!("event: feed\ndata: {}\n\n", json)),
        Err(e) => {
            tracing::error!("Failed to encode feed snapshot: {}", e);
            Bytes::from_static(b": encode error\n\n")
        }
    }
}
