//! Request and response DTOs for the job gateway endpoints.

mod generate;
mod jobs;
mod status;

pub use generate::{GenerateRequest, GenerateResponse};
pub use jobs::JobStatusResponse;
pub use status::{HealthResponse, ProviderStatus, RendererStatus, StatusResponse};
