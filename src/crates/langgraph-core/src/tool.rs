//! Tool call data types shared by [`messages`](crate::messages) and
//! [`llm`](crate::llm).
//!
//! This crate does not execute tools itself; it only carries the
//! request/response shapes a function-calling model exchanges with its
//! caller. Executing a named tool and feeding the result back as a
//! `Message::tool(...)` is the embedding application's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced while resolving or running a tool call.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum ToolError {
    /// Tool not found in registry
    #[error("Tool '{0}' not found. Available tools: {1}")]
    ToolNotFound(String, String),

    /// Invalid tool arguments
    #[error("Invalid arguments for tool '{tool}': {error}")]
    InvalidArguments { tool: String, error: String },

    /// Tool execution failed
    #[error("Tool '{tool}' execution failed: {error}")]
    ExecutionFailed { tool: String, error: String },

    /// Tool invocation error
    #[error("Tool '{tool}' invocation error: {error}")]
    InvocationFailed { tool: String, error: String },

    /// Validation error
    #[error("Validation error for tool '{tool}': {error}")]
    ValidationError { tool: String, error: String },
}

/// Tool call request, as returned by a function-calling model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID (for tracking)
    pub id: String,

    /// Tool name to invoke
    pub name: String,

    /// Tool arguments (JSON object)
    pub args: Value,
}

/// Tool call result, to be fed back to the model as a tool message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Tool call ID (matches the request)
    pub id: String,

    /// Tool name that was invoked
    pub name: String,

    /// Tool output (success or error)
    pub output: ToolOutput,
}

/// Tool execution output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutput {
    /// Successful execution
    Success { content: Value },

    /// Execution failed with error
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_round_trips_through_json() {
        let call = ToolCall { id: "1".to_string(), name: "search".to_string(), args: serde_json::json!({"q": "x"}) };
        let json = serde_json::to_string(&call).unwrap();
        let back: ToolCall = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "search");
    }

    #[test]
    fn tool_output_error_carries_message() {
        let output = ToolOutput::Error { error: "boom".to_string() };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("boom"));
    }
}
