//! HTTP surface for the job gateway: `POST /api/generate`,
//! `GET /api/jobs/:id`, static `/media` delivery, `/health`, and
//! `/api/status`.

pub mod error;
pub mod response;
pub mod middleware;
pub mod models;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use error::{ApiError, ApiResult, ApiErrorResponse};
pub use response::{SuccessResponse, ErrorResponse, PaginatedResponse};
pub use routes::create_router;
pub use state::{AppState, SharedState};
pub use middleware::cors_layer;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::api::error::{ApiError, ApiResult};
    pub use crate::api::models::*;
    pub use crate::api::response::*;
}
