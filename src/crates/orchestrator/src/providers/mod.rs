//! LLM provider federation: a capability interface over four vendor
//! adapters, a task-based router, and an ordered fallback chain with
//! per-provider failure accounting.

pub mod adapter;
pub mod chain;
pub mod router;

pub use adapter::{
    AnthropicAdapter, Capability, DeepSeekAdapter, GeminiAdapter, OpenAiAdapter, ProviderAdapter,
    ProviderName,
};
pub use chain::FallbackChain;
pub use router::{Router, Task};

use crate::config::ServerConfig;
use llm::config::RemoteLlmConfig;
use llm::remote::{ClaudeClient, DeepseekClient, GeminiClient, OpenAiClient};
use std::sync::Arc;

/// Construct every configured adapter from environment-provided API keys
/// and the server's base-URL/model configuration. A missing API key
/// yields an adapter that reports itself unavailable rather than a
/// construction failure, so partial vendor outages never prevent startup.
pub fn build_providers(config: &ServerConfig) -> Vec<Arc<dyn ProviderAdapter>> {
    let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| "claude-3-5-sonnet-20241022".into());
        let cfg = RemoteLlmConfig::new(key, &config.providers.anthropic_base_url, model);
        providers.push(Arc::new(AnthropicAdapter::new(ClaudeClient::new(cfg), true)));
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
        let cfg = RemoteLlmConfig::new(key, &config.providers.openai_base_url, model);
        providers.push(Arc::new(OpenAiAdapter::new(OpenAiClient::new(cfg), true)));
    }

    if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-pro".into());
        let cfg = RemoteLlmConfig::new(key, &config.providers.gemini_base_url, model);
        providers.push(Arc::new(GeminiAdapter::new(GeminiClient::new(cfg), true)));
    }

    if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
        let model = std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".into());
        let cfg = RemoteLlmConfig::new(key, &config.providers.deepseek_base_url, model);
        providers.push(Arc::new(DeepSeekAdapter::new(DeepseekClient::new(cfg), true)));
    }

    providers
}

/// Parse the `FALLBACK_CHAIN` environment variable (comma-separated
/// provider names) into an ordered list, falling back to the default
/// chain order if unset or unparseable.
pub fn fallback_chain_order() -> Vec<ProviderName> {
    match std::env::var("FALLBACK_CHAIN") {
        Ok(raw) => {
            let parsed: Vec<ProviderName> = raw
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if parsed.is_empty() {
                FallbackChain::DEFAULT_ORDER.to_vec()
            } else {
                parsed
            }
        }
        Err(_) => FallbackChain::DEFAULT_ORDER.to_vec(),
    }
}
