//! API error types and HTTP response conversion.
//!
//! `ApiError` wraps [`OrchestratorError`] and adds the two variants that
//! only make sense at the HTTP boundary: `NotFound` and `BadRequest`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OrchestratorError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("JSON error: {0}")]
    JsonError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::JsonError(_) => StatusCode::BAD_REQUEST,
            ApiError::Orchestrator(err) => match err {
                OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
                OrchestratorError::ProviderTransient(_) | OrchestratorError::ProviderPermanent(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                OrchestratorError::Environment(_) => StatusCode::SERVICE_UNAVAILABLE,
                OrchestratorError::CodeGeneration(_)
                | OrchestratorError::Renderer(_)
                | OrchestratorError::Internal(_)
                | OrchestratorError::General(_)
                | OrchestratorError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::JsonError(_) => "JSON_ERROR",
            ApiError::Orchestrator(err) => match err {
                OrchestratorError::Validation(_) => "VALIDATION_ERROR",
                OrchestratorError::ProviderTransient(_) => "PROVIDER_TRANSIENT",
                OrchestratorError::ProviderPermanent(_) => "PROVIDER_PERMANENT",
                OrchestratorError::CodeGeneration(_) => "CODE_GENERATION_ERROR",
                OrchestratorError::Renderer(_) => "RENDERER_ERROR",
                OrchestratorError::Environment(_) => "NO_RENDERER_AVAILABLE",
                OrchestratorError::Internal(_) => "INTERNAL_ERROR",
                OrchestratorError::General(_) => "GENERAL_ERROR",
                OrchestratorError::Serialization(_) => "SERIALIZATION_ERROR",
            },
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::JsonError(_) => "JsonError",
            ApiError::Orchestrator(_) => "OrchestratorError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        tracing::error!("API Error: {:?}", body);

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::NotFound("job".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = ApiError::BadRequest("missing field".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_error_maps_to_400() {
        let err: ApiError = OrchestratorError::Validation("concept too long".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn no_provider_available_maps_to_503() {
        let err: ApiError = OrchestratorError::ProviderTransient("all providers down".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn renderer_error_maps_to_500() {
        let err: ApiError = OrchestratorError::Renderer("ffmpeg missing".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
