//! Operational routes

use crate::{models::ApiResponse, AppState};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use super::health::{handle_component_health, handle_health, handle_liveness};
use super::metrics::handle_stats;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handle_health))
        .route("/health/:component", get(handle_component_health))
        .route("/live", get(handle_liveness))
        .route("/stats", get(handle_stats))
        .fallback(handle_not_found)
}

async fn handle_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("Route not found".to_string())),
    )
}
