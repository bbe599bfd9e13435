//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe: always returns 200 once the process is up and serving.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub face_detector: &'static str,
    pub face_mesh: &'static str,
    pub pose_detector: &'static str,
    pub object_detector: &'static str,
}

/// Readiness probe: returns 200 once the model registry has finished its
/// startup attempt, degraded or not. A model that failed to load makes its
/// own check report `"unavailable"` without blocking the process from
/// serving the others.
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let as_str = |available: bool| if available { "ok" } else { "unavailable" };

    let checks = ReadinessChecks {
        face_detector: as_str(state.models.face_availability().is_available()),
        face_mesh: as_str(state.models.mesh_availability().is_available()),
        pose_detector: as_str(state.models.pose_availability().is_available()),
        object_detector: as_str(state.models.object_availability().is_available()),
    };

    let response = ReadinessResponse {
        status: if state.models.startup_complete() { "ready" } else { "starting" }.to_string(),
        checks,
    };

    if state.models.startup_complete() {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
