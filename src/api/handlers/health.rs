use crate::{AppState, types::HealthResponse};
use axum::{Json, extract::State};

/// Liveness check with the number of runs still in progress
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Server is healthy", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_runs: state.runs.active_count(),
    })
}
