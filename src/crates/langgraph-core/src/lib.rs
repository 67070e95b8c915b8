//! # langgraph-core - chat-model traits and message types
//!
//! `langgraph-core` supplies the provider-agnostic surface that
//! `orchestrator`'s provider adapters are built on: a [`ChatModel`] trait,
//! request/response types, and a chat [`Message`] representation with
//! role/content/tool-call fields. It does not implement any provider
//! itself, nor the graph-execution machinery the name might suggest --
//! only the trait boundary an adapter implements and the types that
//! cross it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use langgraph_core::llm::{ChatModel, ChatRequest, ChatResponse};
//! use langgraph_core::Message;
//! use async_trait::async_trait;
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ChatModel for MyProvider {
//!     async fn chat(&self, request: ChatRequest) -> langgraph_core::error::Result<ChatResponse> {
//!         Ok(ChatResponse::new(Message::ai("hello")))
//!     }
//!
//!     async fn stream(&self, request: ChatRequest) -> langgraph_core::error::Result<langgraph_core::llm::ChatStreamResponse> {
//!         unimplemented!()
//!     }
//!
//!     fn clone_box(&self) -> Box<dyn ChatModel> {
//!         Box::new(Self)
//!     }
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`error`] - [`GraphError`] and the crate's `Result` alias
//! - [`messages`] - [`Message`], roles, content, and history utilities
//! - [`tool`] - plain tool-call/tool-result data types
//! - [`llm`] - [`ChatModel`], [`ChatRequest`]/[`ChatResponse`], tool definitions
//! - [`llm_stream`] - token-level streaming helpers for `ChatModel::stream`

pub mod error;
pub mod llm;
pub mod llm_stream;
pub mod messages;
pub mod tool;

pub use error::{GraphError, Result};
pub use messages::{
    add_message_likes, add_messages, convert_to_messages, filter_by_role, get_last_message,
    get_messages_by_id, merge_consecutive_messages, trim_messages, truncate_messages, ContentPart,
    Message, MessageContent, MessageLike, MessageRole, RemoveMessage, TrimOptions, TrimStrategy,
};
