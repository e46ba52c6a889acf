//! GET /history/{user_id}

use crate::handlers::AppState;
use crate::history::{HistoryEntry, room_for_user};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    pub success: bool,
}

/// Return a user's conversation history in insertion order
pub async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<HistoryResponse> {
    let room_id = room_for_user(user_id);
    match state.history.entries(&room_id).await {
        Ok(entries) => Json(HistoryResponse {
            history: entries,
            success: true,
        }),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "History read failed");
            Json(HistoryResponse {
                history: Vec::new(),
                success: false,
            })
        }
    }
}
