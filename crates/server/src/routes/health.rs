use axum::{Json, extract::State};
use clubhouse_api::HealthResponse;

use crate::state::SharedBackend;

/// GET /api/health — server liveness check.
pub async fn health(State(backend): State<SharedBackend>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: backend.name().to_string(),
    })
}
