use crate::providers::ProviderName;
use crate::renderer::RendererKind;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

/// Response of `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub providers: Vec<ProviderStatus>,
    pub renderers: Vec<RendererStatus>,
    #[serde(rename = "activeJobs")]
    pub active_jobs: usize,
    #[serde(rename = "uptimeSeconds")]
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: ProviderName,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RendererStatus {
    pub kind: RendererKind,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_defaults_to_ok() {
        assert_eq!(HealthResponse::default().status, "ok");
    }
}
