use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let now = Utc::now();
    let longest_session_secs = state
        .sessions
        .iter()
        .map(|s| (now - s.connected_at).num_seconds().max(0))
        .max()
        .unwrap_or(0);

    Json(json!({
        "status": "ok",
        "service": "word-tiles-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.len(),
        "longest_session_secs": longest_session_secs,
        "catalog_words": state.catalog.len()
    }))
}
