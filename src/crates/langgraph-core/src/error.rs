//! Error types for chat-model integration.
//!
//! All errors implement `std::error::Error` via `thiserror`, and every
//! structured variant provides a matching helper constructor.
//!
//! # Examples
//!
//! ```rust
//! use langgraph_core::error::GraphError;
//!
//! let err = GraphError::node_execution("llm", "API key not found");
//! assert_eq!(format!("{}", err), "Node 'llm' execution failed: API key not found");
//! ```

use thiserror::Error;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type covering the chat-model integration surface.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Request or configuration validation failed before any call was made.
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A named operation failed with context about what was running.
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the operation that failed
        node: String,
        /// Error message from the failed operation
        error: String,
    },

    /// Generic execution error without specific operation context.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The caller requested a pause for human input; not itself an error.
    #[error("Graph execution interrupted at node '{node}': {reason}")]
    Interrupted {
        /// Node where execution was interrupted
        node: String,
        /// Reason for the interrupt
        reason: String,
    },

    /// State management error with optional node context.
    #[error("State error{}: {error}", node.as_ref().map(|n| format!(" in node '{}'", n)).unwrap_or_default())]
    StateError {
        /// Optional node context where error occurred
        node: Option<String>,
        /// Error description
        error: String,
    },

    /// Generic state error without context.
    #[error("State error: {0}")]
    State(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation exceeded its time limit.
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Application-defined error not covered by the other variants.
    #[error("{0}")]
    Custom(String),
}

impl GraphError {
    /// Build a [`GraphError::NodeExecution`] from a name and message.
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution { node: node.into(), error: error.into() }
    }

    /// Build a [`GraphError::StateError`] with optional node context.
    pub fn state_error(node: Option<impl Into<String>>, error: impl Into<String>) -> Self {
        Self::StateError { node: node.map(|n| n.into()), error: error.into() }
    }

    /// Build a [`GraphError::Interrupted`] from a node and reason.
    pub fn interrupted(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Interrupted { node: node.into(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_execution_formats_with_node_and_error() {
        let err = GraphError::node_execution("llm_call", "timeout");
        assert_eq!(format!("{err}"), "Node 'llm_call' execution failed: timeout");
    }

    #[test]
    fn state_error_includes_node_when_present() {
        let err = GraphError::state_error(Some("process"), "missing field");
        assert_eq!(format!("{err}"), "State error in node 'process': missing field");
    }

    #[test]
    fn state_error_omits_node_when_absent() {
        let err = GraphError::state_error(None::<String>, "missing field");
        assert_eq!(format!("{err}"), "State error: missing field");
    }
}
