use crate::api::models::JobStatusResponse;
use crate::api::state::SharedState;
use axum::extract::{Path, State};
use axum::Json;

/// `GET /api/jobs/:id`.
pub async fn get_job(State(state): State<SharedState>, Path(id): Path<String>) -> Json<JobStatusResponse> {
    let result = state.job_store.get(&id);
    Json(result.into())
}
