use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::{models::Progress, AppState};

/// Saved progress for the player on this server
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Progress>, StatusCode> {
    state.progress.load().await.map(Json).map_err(|e| {
        tracing::error!("Failed to load progress: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
