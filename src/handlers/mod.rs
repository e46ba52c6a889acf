//! HTTP request handlers
//!
//! The ask handler is the one surface with the no-500 guarantee: pipeline
//! failures arrive here already converted to soft replies, so only a
//! structurally invalid request ever produces a non-200 status.

pub mod ask;
pub mod health;
pub mod history;
pub mod metrics;

use crate::history::HistoryStore;
use crate::orchestrator::Orchestrator;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub history: Arc<dyn HistoryStore>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ask", post(ask::ask))
        .route("/history/{user_id}", get(history::history))
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .layer(middleware::from_fn(
            crate::middleware::request_id_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
