//! GET /metrics

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

/// Prometheus text exposition of the default registry
pub async fn metrics() -> Response {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
        .into_response()
}
