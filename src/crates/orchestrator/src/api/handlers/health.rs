use crate::api::models::HealthResponse;
use axum::Json;

/// `GET /health`. Shallow liveness probe: if the process can answer, it's up.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
