//! Response types returned by [`ChatModel`](crate::llm::ChatModel) implementations.

use crate::llm_stream::MessageChunkStream;
use crate::messages::Message;
use std::collections::HashMap;

/// A complete response from a chat model.
///
/// Holds the assistant message, token usage, and (for thinking models)
/// the reasoning content produced before the final answer.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's response message.
    pub message: Message,

    /// Reasoning/thinking content, present when the provider exposes it and
    /// the request asked for it via `ReasoningMode::Separated` (or similar).
    pub reasoning: Option<ReasoningContent>,

    /// Token usage for this exchange, when the provider reports it.
    pub usage: Option<UsageMetadata>,

    /// Provider-specific extras (model name, finish reason, etc.).
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatResponse {
    /// Create a response carrying only a message, with no usage/reasoning/metadata.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            reasoning: None,
            usage: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach reasoning content.
    pub fn with_reasoning(mut self, reasoning: ReasoningContent) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    /// Attach usage metadata.
    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A streaming response from a chat model: a stream of message chunks plus
/// whatever usage/reasoning metadata becomes available once the stream ends.
pub struct ChatStreamResponse {
    /// Stream of incremental message chunks.
    pub chunks: MessageChunkStream,

    /// Reasoning content, if the provider separates it from the final answer.
    /// Populated only after the stream has been fully consumed by callers
    /// that choose to track it themselves; most providers leave this `None`
    /// and surface reasoning chunks inline instead.
    pub reasoning: Option<ReasoningContent>,
}

impl std::fmt::Debug for ChatStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamResponse")
            .field("reasoning", &self.reasoning)
            .finish_non_exhaustive()
    }
}

impl ChatStreamResponse {
    /// Wrap a chunk stream with no reasoning attached yet.
    pub fn new(chunks: MessageChunkStream) -> Self {
        Self {
            chunks,
            reasoning: None,
        }
    }
}

/// The extended thinking/reasoning a model produced before its final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningContent {
    /// The raw reasoning text.
    pub content: String,
}

impl ReasoningContent {
    /// Wrap reasoning text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Token accounting for a single chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageMetadata {
    /// Tokens consumed by the prompt/input.
    pub input_tokens: u32,

    /// Tokens produced in the visible response.
    pub output_tokens: u32,

    /// Tokens spent on hidden reasoning, for thinking models that report it.
    pub reasoning_tokens: Option<u32>,
}

impl UsageMetadata {
    /// Usage with no reasoning tokens tracked.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens: None,
        }
    }

    /// Usage including a reasoning token count, for thinking models.
    pub fn with_reasoning(input_tokens: u32, output_tokens: u32, reasoning_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens: Some(reasoning_tokens),
        }
    }

    /// Total tokens across input, output, and reasoning.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens + self.reasoning_tokens.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_total_includes_reasoning() {
        let usage = UsageMetadata::with_reasoning(10, 20, 5);
        assert_eq!(usage.total_tokens(), 35);
    }

    #[test]
    fn usage_total_without_reasoning() {
        let usage = UsageMetadata::new(10, 20);
        assert_eq!(usage.total_tokens(), 30);
        assert_eq!(usage.reasoning_tokens, None);
    }

    #[test]
    fn chat_response_builders() {
        let response = ChatResponse::new(Message::ai("hello"))
            .with_usage(UsageMetadata::new(3, 4))
            .with_reasoning(ReasoningContent::new("thinking..."));

        assert_eq!(response.usage.unwrap().total_tokens(), 7);
        assert_eq!(response.reasoning.unwrap().content, "thinking...");
    }
}
