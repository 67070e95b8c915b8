//! Concept-to-animation job pipeline orchestrator.
//!
//! Turns a natural-language concept into a rendered mathematical animation:
//! a job gateway accepts submissions, an event-driven pipeline of agents
//! builds a pedagogical plan and generates scene code, and a renderer
//! dispatch layer invokes an external animation engine as a child process.

pub mod api;
pub mod config;
pub mod domain;
pub mod events;
pub mod executor;
pub mod job;
pub mod pipeline;
pub mod providers;
pub mod renderer;
pub mod session;
pub mod version;

use thiserror::Error;

/// Crate-wide error taxonomy. Every pipeline stage, provider adapter, and
/// renderer invocation reports failures through this enum; the HTTP
/// boundary (`api::error::ApiError`) wraps it and adds request-shape-only
/// variants that never reach the pipeline.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Bad input: concept too long, invalid style/quality, malformed request.
    #[error("validation error: {0}")]
    Validation(String),

    /// Provider call failed in a way that may succeed on retry (timeout, 5xx,
    /// rate limit). Counted against the provider's failure count and failed
    /// over to the next provider in the chain.
    #[error("provider error (transient): {0}")]
    ProviderTransient(String),

    /// Provider call failed in a way that will not succeed on retry (auth,
    /// 4xx). Still failed over to the next provider, but not retried
    /// in-process against the same provider.
    #[error("provider error (permanent): {0}")]
    ProviderPermanent(String),

    /// No provider produced usable code, or the generated code has no
    /// `MainScene` definition.
    #[error("code generation failed: {0}")]
    CodeGeneration(String),

    /// Renderer child process exited non-zero, produced no output file, or
    /// stderr contained a recognized failure signature.
    #[error("renderer error: {0}")]
    Renderer(String),

    /// No renderer variant is available in the current environment.
    #[error("environment error: {0}")]
    Environment(String),

    /// Handler panic, event bus failure, or other defect-class failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Catch-all carried over from generic string-classified failures; kept
    /// so `executor::retry::classify_error`'s message-matching fallback
    /// still has somewhere to land.
    #[error("orchestrator error: {0}")]
    General(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    /// Whether this variant should be surfaced to an HTTP caller as 400.
    pub fn is_validation(&self) -> bool {
        matches!(self, OrchestratorError::Validation(_))
    }
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Get version information.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
