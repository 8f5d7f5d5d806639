use crate::server::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::{sync::Arc, time::Instant};
use tracing::info;

/// Logs every request with the caller's canonical id once it completes.
pub async fn log_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let requester = req
        .headers()
        .get(state.config.acl.requester_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    let response = next.run(req).await;

    info!(
        method = %method,
        uri = %uri,
        requester = %requester,
        status = %response.status(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
