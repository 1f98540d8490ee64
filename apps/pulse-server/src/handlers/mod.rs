//! HTTP handlers and route configuration.

mod comments;
mod feed;
mod health;
mod posts;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            // Feed
            .service(
                web::scope("/feed")
                    .route("", web::get().to(feed::get_feed))
                    .route("/refresh", web::post().to(feed::refresh))
                    .route("/stream", web::get().to(feed::stream)),
            )
            // Posts and their comments
            .service(
                web::scope("/posts")
                    .route("", web::post().to(posts::create))
                    .route("/{id}", web::get().to(posts::get))
                    .route("/{id}", web::delete().to(posts::delete))
                    .route("/{id}/like", web::post().to(posts::toggle_like))
                    .route("/{id}/comments", web::get().to(comments::list))
                    .route("/{id}/comments", web::post().to(comments::create)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use pulse_core::{GatewayError, StoreConfig};
    use pulse_infra::{GatewayOp, InMemoryGateway};
    use serde_json::{Value, json};

    use super::configure_routes;
    use crate::state::AppState;

    async fn loaded_state() -> (AppState, Arc<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::seeded().unwrap());
        let state = AppState::with_gateway(gateway.clone(), StoreConfig::default());
        state.store.load_all().await.unwrap();
        (state, gateway)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(actix_web::web::Data::new($state.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_reports_store_occupancy() {
        let (state, _) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["posts"], 5);
        assert_eq!(body["pending"], 0);
    }

    #[actix_web::test]
    async fn test_feed_lists_posts_newest_first() {
        let (state, _) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/feed").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 5);
        assert_eq!(posts[0]["id"], 1);
        assert_eq!(posts[4]["username"], "Anonymous");
        assert_eq!(body["phase"], "idle");
    }

    #[actix_web::test]
    async fn test_like_returns_confirmed_post() {
        let (state, _) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/posts/1/like").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["isLiked"], true);
        assert_eq!(body["likeCount"], 129);
    }

    #[actix_web::test]
    async fn test_failed_like_maps_to_bad_gateway_and_rolls_back() {
        let (state, gateway) = loaded_state().await;
        gateway.fail_next(GatewayOp::Update, GatewayError::Transport("offline".into()));
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/posts/1/like").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], 502);
        assert_eq!(body["operation"], "like");

        let post = state.store.post(pulse_core::domain::RecordId(1)).unwrap();
        assert_eq!(post.like_count, 128);
        assert!(!post.is_liked);
    }

    #[actix_web::test]
    async fn test_unknown_post_is_not_found() {
        let (state, _) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/posts/999/like").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/posts/999").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_blank_comment_is_rejected() {
        let (state, gateway) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/posts/1/comments")
            .set_json(json!({ "content": "   " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(GatewayOp::Create), 0);
    }

    #[actix_web::test]
    async fn test_comment_is_created_and_listed() {
        let (state, _) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/posts/1/comments")
            .set_json(json!({ "content": "Stunning", "author": "Alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: Value = test::read_body_json(resp).await;
        assert!(created["id"].is_u64());
        assert_eq!(created["username"], "Alice");

        let req = test::TestRequest::get().uri("/api/posts/1/comments").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().any(|c| c["content"] == "Stunning"));

        let post = state.store.post(pulse_core::domain::RecordId(1)).unwrap();
        assert_eq!(post.comment_count, 3);
    }

    #[actix_web::test]
    async fn test_post_is_created_then_deleted() {
        let (state, _) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .set_json(json!({ "content": "Hello, feed", "author": "Alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["id"], 6);
        assert_eq!(created["likeCount"], 0);
        assert_eq!(state.store.posts().len(), 6);

        let req = test::TestRequest::delete().uri("/api/posts/6").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store.posts().len(), 5);
    }

    #[actix_web::test]
    async fn test_refresh_wraps_snapshot_in_envelope() {
        let (state, gateway) = loaded_state().await;
        let app = app!(state);

        let req = test::TestRequest::post().uri("/api/feed/refresh").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["posts"].as_array().unwrap().len(), 5);
        assert_eq!(gateway.calls(GatewayOp::List), 2);
    }
}
