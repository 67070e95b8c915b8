//! The provider-adapter boundary: a uniform capability interface over the
//! four concrete remote LLM clients. No vendor-specific branching happens
//! above this boundary.

use crate::{OrchestratorError, Result};
use async_trait::async_trait;
use langgraph_core::llm::{ChatModel, ChatRequest};
use langgraph_core::Message;
use llm::remote::{ClaudeClient, DeepseekClient, GeminiClient, OpenAiClient};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four vendors grounding the provider interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Anthropic,
    OpenAi,
    Gemini,
    DeepSeek,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Anthropic => "anthropic",
            ProviderName::OpenAi => "openai",
            ProviderName::Gemini => "gemini",
            ProviderName::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderName {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderName::Anthropic),
            "openai" => Ok(ProviderName::OpenAi),
            "gemini" | "google" => Ok(ProviderName::Gemini),
            "deepseek" => Ok(ProviderName::DeepSeek),
            other => Err(OrchestratorError::Validation(format!(
                "unknown provider name: {other}"
            ))),
        }
    }
}

/// Task types a provider may be capable of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CodeGeneration,
    IntentAnalysis,
    MathEnrichment,
    Vision,
    Streaming,
    FunctionCalling,
}

/// Uniform interface over a remote LLM provider. Concrete adapters wrap
/// one of the four vendor clients from the `llm` crate and expose the
/// task-shaped convenience methods pipeline agents call.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> ProviderName;
    fn display_name(&self) -> &'static str;
    fn capabilities(&self) -> &[Capability];

    /// Whether this provider is configured and reachable. Adapters that
    /// wrap an API-key-based client report availability based on whether
    /// the key was present at construction time.
    async fn is_available(&self) -> bool;

    async fn generate_code(&self, prompt: &str) -> Result<String>;
    async fn analyze_intent(&self, text: &str) -> Result<String>;
    async fn enrich_math(&self, concept: &str) -> Result<String>;
    async fn health_check(&self) -> Result<()>;
}

/// Turn a `langgraph_core` chat error into our taxonomy, classifying by
/// message content the same way `executor::retry::classify_error` does
/// for the `General` variant, since vendor HTTP status detail is folded
/// into the error string by the time it crosses the `ChatModel` boundary.
fn classify_chat_error(err: langgraph_core::error::GraphError) -> OrchestratorError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();

    let permanent = lower.contains("401")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("api key")
        || lower.contains("403")
        || lower.contains("forbidden")
        || lower.contains("404")
        || lower.contains("400")
        || lower.contains("bad request")
        || lower.contains("invalid request");

    if permanent {
        OrchestratorError::ProviderPermanent(msg)
    } else {
        OrchestratorError::ProviderTransient(msg)
    }
}

async fn chat_once(model: &dyn ChatModel, prompt: &str) -> Result<String> {
    let request = ChatRequest::new(vec![Message::human(prompt)]);
    let response = model.chat(request).await.map_err(classify_chat_error)?;
    Ok(response.message.text().unwrap_or_default().to_string())
}

macro_rules! provider_adapter {
    ($adapter:ident, $client:ty, $name:expr, $display:expr, $caps:expr) => {
        pub struct $adapter {
            client: $client,
            configured: bool,
        }

        impl $adapter {
            pub fn new(client: $client, configured: bool) -> Self {
                Self { client, configured }
            }
        }

        #[async_trait]
        impl ProviderAdapter for $adapter {
            fn name(&self) -> ProviderName {
                $name
            }

            fn display_name(&self) -> &'static str {
                $display
            }

            fn capabilities(&self) -> &[Capability] {
                $caps
            }

            async fn is_available(&self) -> bool {
                self.configured
            }

            async fn generate_code(&self, prompt: &str) -> Result<String> {
                chat_once(&self.client, prompt).await
            }

            async fn analyze_intent(&self, text: &str) -> Result<String> {
                let prompt = format!(
                    "Classify the intent of this animation request and respond with a short label: {text}"
                );
                chat_once(&self.client, &prompt).await
            }

            async fn enrich_math(&self, concept: &str) -> Result<String> {
                let prompt = format!(
                    "List key equations, theorems and definitions relevant to: {concept}"
                );
                chat_once(&self.client, &prompt).await
            }

            async fn health_check(&self) -> Result<()> {
                chat_once(&self.client, "ping").await.map(|_| ())
            }
        }
    };
}

provider_adapter!(
    AnthropicAdapter,
    ClaudeClient,
    ProviderName::Anthropic,
    "Anthropic Claude",
    &[Capability::CodeGeneration, Capability::IntentAnalysis, Capability::MathEnrichment]
);

provider_adapter!(
    OpenAiAdapter,
    OpenAiClient,
    ProviderName::OpenAi,
    "OpenAI",
    &[
        Capability::CodeGeneration,
        Capability::IntentAnalysis,
        Capability::FunctionCalling,
        Capability::Streaming
    ]
);

provider_adapter!(
    GeminiAdapter,
    GeminiClient,
    ProviderName::Gemini,
    "Google Gemini",
    &[Capability::MathEnrichment, Capability::IntentAnalysis, Capability::Vision]
);

provider_adapter!(
    DeepSeekAdapter,
    DeepseekClient,
    ProviderName::DeepSeek,
    "DeepSeek",
    &[Capability::CodeGeneration, Capability::MathEnrichment]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_round_trips_through_str() {
        use std::str::FromStr;
        assert_eq!(ProviderName::from_str("Anthropic").unwrap(), ProviderName::Anthropic);
        assert_eq!(ProviderName::from_str("claude").unwrap(), ProviderName::Anthropic);
        assert!(ProviderName::from_str("bogus").is_err());
    }

    #[test]
    fn classifies_auth_errors_as_permanent() {
        let err = classify_chat_error(langgraph_core::error::GraphError::Validation(
            "Authentication failed: invalid api key".into(),
        ));
        assert!(matches!(err, OrchestratorError::ProviderPermanent(_)));
    }

    #[test]
    fn classifies_timeout_as_transient() {
        let err = classify_chat_error(langgraph_core::error::GraphError::Validation(
            "Request timeout: deadline exceeded".into(),
        ));
        assert!(matches!(err, OrchestratorError::ProviderTransient(_)));
    }
}
