//! Health check handlers

use crate::{
    error::{AppError, Result},
    health::HealthStatus,
    models::ApiResponse,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{debug, warn};

fn status_code_for(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("GET /health - Running health checks");

    let system_health = state.health_checker.check_all().await;
    if system_health.overall_status != HealthStatus::Healthy {
        warn!("System health is {}", system_health.overall_status);
    }

    (
        status_code_for(&system_health.overall_status),
        Json(ApiResponse::success(system_health)),
    )
}

pub async fn handle_component_health(
    State(state): State<AppState>,
    Path(component): Path<String>,
) -> Result<impl IntoResponse> {
    debug!("GET /health/{} - Checking specific component", component);

    let component_health = state
        .health_checker
        .check_component(&component)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Component '{}' not found", component)))?;

    Ok((
        status_code_for(&component_health.status),
        Json(ApiResponse::success(component_health)),
    ))
}

pub async fn handle_liveness(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "status": "alive",
            "app": state.app_name,
            "version": state.version,
            "timestamp": chrono::Utc::now().timestamp()
        }))),
    )
}
