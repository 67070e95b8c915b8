//! Token-level streaming utilities for [`ChatModel::stream`](crate::llm::ChatModel::stream)
//! implementations.

use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;

/// A stream of raw string chunks (tokens).
pub type TokenStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// A stream of [`MessageChunk`]s with metadata attached.
pub type MessageChunkStream = Pin<Box<dyn Stream<Item = MessageChunk> + Send>>;

/// A chunk of a streaming message.
#[derive(Debug, Clone)]
pub struct MessageChunk {
    /// The content chunk (token or partial message)
    pub content: String,

    /// Optional message ID this chunk belongs to
    pub message_id: Option<String>,

    /// Whether this is the final chunk
    pub is_final: bool,

    /// Optional metadata (model name, finish_reason, etc.)
    pub metadata: Option<Value>,
}

impl MessageChunk {
    /// Create a new message chunk.
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), message_id: None, is_final: false, metadata: None }
    }

    /// Attach metadata to the chunk.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Mark this chunk as the final chunk of the stream.
    pub fn final_chunk(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Set the message ID this chunk belongs to.
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// Accumulates streaming tokens into a complete message.
#[derive(Debug, Default)]
pub struct TokenBuffer {
    buffer: String,
    chunk_count: usize,
    finished: bool,
}

impl TokenBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the buffer.
    pub fn add_chunk(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        self.chunk_count += 1;
    }

    /// Mark the stream as finished.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Current buffer content.
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Number of chunks received so far.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Whether [`TokenBuffer::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reset the buffer to empty.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.chunk_count = 0;
        self.finished = false;
    }

    /// Consume the buffer, returning the accumulated content.
    pub fn into_string(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_chunk_creation() {
        let chunk = MessageChunk::new("Hello").with_message_id("msg_123").final_chunk();

        assert_eq!(chunk.content, "Hello");
        assert_eq!(chunk.message_id, Some("msg_123".to_string()));
        assert!(chunk.is_final);
    }

    #[test]
    fn token_buffer_accumulates_and_resets() {
        let mut buffer = TokenBuffer::new();

        buffer.add_chunk("Hello");
        buffer.add_chunk(" ");
        buffer.add_chunk("world");

        assert_eq!(buffer.content(), "Hello world");
        assert_eq!(buffer.chunk_count(), 3);
        assert!(!buffer.is_finished());

        buffer.finish();
        assert!(buffer.is_finished());
        assert_eq!(buffer.into_string(), "Hello world");
    }
}
