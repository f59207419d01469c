use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::api::handlers;
use crate::api::resource_handlers::ResourceHandlers;
use crate::model::{Booking, Resource, Review, Room, User};
use crate::store::traits::DocumentStore;

pub const API_PREFIX: &str = "/api/v1";

/// List and create on `/`, read, update and delete on `/:id`.
fn resource_routes<S, R>() -> Router<Arc<S>>
where
    S: DocumentStore + 'static,
    R: Resource,
{
    Router::new()
        .route(
            "/",
            get(ResourceHandlers::<R>::list::<S>).post(ResourceHandlers::<R>::create::<S>),
        )
        .route(
            "/:id",
            get(ResourceHandlers::<R>::get_one::<S>)
                .patch(ResourceHandlers::<R>::update::<S>)
                .delete(ResourceHandlers::<R>::delete::<S>),
        )
}

fn review_routes<S: DocumentStore + 'static>() -> Router<Arc<S>> {
    Router::new()
        .route(
            "/",
            get(ResourceHandlers::<Review>::list::<S>).post(handlers::create_review::<S>),
        )
        .route(
            "/:id",
            get(ResourceHandlers::<Review>::get_one::<S>)
                .patch(ResourceHandlers::<Review>::update::<S>)
                .delete(ResourceHandlers::<Review>::delete::<S>),
        )
}

fn booking_routes<S: DocumentStore + 'static>() -> Router<Arc<S>> {
    Router::new()
        .route("/my-bookings", get(handlers::my_bookings::<S>))
        .route(
            "/room-day-bookings/:room_id",
            post(handlers::room_day_bookings::<S>),
        )
        .merge(resource_routes::<S, Booking>())
}

pub fn create_router<S: DocumentStore + 'static>(public_dir: impl AsRef<Path>) -> Router<Arc<S>> {
    let api = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .nest("/room", resource_routes::<S, Room>())
        .nest("/user", resource_routes::<S, User>())
        .nest("/review", review_routes::<S>())
        .nest("/booking", booking_routes::<S>());

    Router::new()
        .nest(API_PREFIX, api)
        // Uploaded room and user pictures
        .nest_service("/images", ServeDir::new(public_dir.as_ref().join("images")))
        .fallback(handlers::route_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router::<MemoryStore>("public").with_state(Arc::new(MemoryStore::new()))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_under_api_prefix() {
        let response = app()
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unmatched_path_reports_full_uri() {
        let response = app()
            .oneshot(Request::get("/api/v1/rooms/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await["message"],
            "Can't find /api/v1/rooms/x on the server!"
        );
    }

    #[tokio::test]
    async fn test_empty_collection_lists() {
        for path in ["/api/v1/room", "/api/v1/user", "/api/v1/review", "/api/v1/booking"] {
            let response = app()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            let body = json_body(response).await;
            assert_eq!(body["results"], 0, "{path}");
            assert_eq!(body["currentPage"], 1, "{path}");
        }
    }

    #[tokio::test]
    async fn test_my_bookings_requires_caller() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/booking/my-bookings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
