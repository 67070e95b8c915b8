use crate::api::models::{ProviderStatus, RendererStatus, StatusResponse};
use crate::api::state::SharedState;
use crate::providers::ProviderName;
use crate::renderer::RendererKind;
use axum::extract::State;
use axum::Json;

/// `GET /api/status`: provider availability, renderer availability,
/// active job count, process uptime.
pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let probe = state.renderer_probe();

    let mut providers = Vec::new();
    for name in [ProviderName::Anthropic, ProviderName::OpenAi, ProviderName::Gemini, ProviderName::DeepSeek] {
        let available = match state.router.provider(name) {
            Some(provider) => provider.is_available().await,
            None => false,
        };
        providers.push(ProviderStatus { name, available });
    }

    let renderers = vec![
        RendererStatus { kind: RendererKind::Standard, available: probe.has_standard },
        RendererStatus { kind: RendererKind::GL, available: probe.has_gl },
    ];

    Json(StatusResponse {
        providers,
        renderers,
        active_jobs: state.active_job_count(),
        uptime_seconds: state.uptime_seconds(),
    })
}
