//! POST /ask

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::orchestrator::Query;
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

/// Queries longer than this are rejected as structurally invalid
const MAX_QUERY_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub response: String,
    pub success: bool,
}

/// Answer one free-text question for a user
///
/// Returns 400 only for structurally invalid requests. Internal pipeline
/// failures come back as 200 with `success = false` and a soft reply.
pub async fn ask(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(request): Json<AskRequest>,
) -> AppResult<Json<AskResponse>> {
    let request_id = request_id.map(|Extension(id)| id).unwrap_or_default();

    let query_text = request.query.trim();
    if query_text.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    if request.query.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::Validation(format!(
            "query exceeds {} characters",
            MAX_QUERY_CHARS
        )));
    }
    if request.user_id <= 0 {
        return Err(AppError::Validation(
            "user_id must be a positive integer".to_string(),
        ));
    }

    tracing::info!(
        request_id = %request_id,
        user_id = request.user_id,
        "Received ask request"
    );

    let query = Query::new(query_text.to_string(), request.user_id);
    let reply = state.orchestrator.process_query(query).await;

    Ok(Json(AskResponse {
        response: reply.text,
        success: reply.success,
    }))
}
