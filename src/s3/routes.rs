use crate::{handlers, server::AppState};
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Buckets and their ACL subresource
        .route(
            "/:bucket",
            get(handlers::handle_bucket_get)
                .put(handlers::handle_bucket_put)
                .delete(handlers::handle_bucket_delete),
        )
        // Objects and their ACL subresource
        .route(
            "/:bucket/*key",
            get(handlers::handle_object_get).put(handlers::handle_object_put),
        )
}
