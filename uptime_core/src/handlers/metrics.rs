//! Sweep statistics handler

use crate::{models::ApiResponse, AppState};

use axum::{extract::State, response::IntoResponse, Json};
use tracing::debug;

pub async fn handle_stats(State(state): State<AppState>) -> impl IntoResponse {
    debug!("GET /stats - Sweep metrics snapshot");
    Json(ApiResponse::success(state.metrics.snapshot()))
}
