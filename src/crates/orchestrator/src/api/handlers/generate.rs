use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{GenerateRequest, GenerateResponse};
use crate::api::state::SharedState;
use crate::events::{Event, Payload, Topic};
use crate::job::Job;
use crate::providers::Task;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

/// `POST /api/generate`. Validates the concept, publishes
/// `concept.submitted`, and returns the new job id immediately; the
/// pipeline runs asynchronously and the caller polls `/api/jobs/:id`.
pub async fn generate(
    State(state): State<SharedState>,
    Json(body): Json<GenerateRequest>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    if state.router.get_provider(Task::CodeGeneration).await.is_none() {
        return Err(ApiError::Orchestrator(crate::OrchestratorError::ProviderTransient(
            "no provider is currently available".to_string(),
        )));
    }

    let job = Job::new(body.concept.clone(), body.quality, body.style, body.use_nlu)
        .map_err(ApiError::Orchestrator)?;

    state.job_started();

    let event = Event::new(
        Topic::ConceptSubmitted,
        job.id.clone(),
        Payload::ConceptSubmitted {
            concept: job.concept.clone(),
            quality: job.quality,
            style: job.style,
            use_smart_mode: job.use_smart_mode,
        },
    );
    state.event_bus.publish(event).await;

    Ok((StatusCode::CREATED, Json(GenerateResponse { job_id: job.id })))
}
