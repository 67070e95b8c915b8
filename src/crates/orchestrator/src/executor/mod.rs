//! Retry and backoff primitives shared by provider federation.

pub mod retry;

pub use retry::{classify_error, retry_with_backoff, ErrorClass, RetryConfig};
