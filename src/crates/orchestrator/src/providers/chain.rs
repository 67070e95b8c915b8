//! Ordered fallback chain with per-provider failure accounting.
//!
//! Process-wide state; failure counts are not persisted and are not
//! auto-reset on a timer (see the open-question decision in the design
//! notes) — only an explicit `reset`/`reset_all` clears them.

use super::adapter::{ProviderAdapter, ProviderName};
use crate::executor::retry::{classify_error, ErrorClass, RetryConfig};
use crate::{OrchestratorError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// An ordered list of providers, each carrying a failure counter.
pub struct FallbackChain {
    chain: Vec<Arc<dyn ProviderAdapter>>,
    failure_counts: Mutex<HashMap<ProviderName, u32>>,
    max_retries: u32,
    retry: RetryConfig,
}

impl FallbackChain {
    /// Default chain order per the federation design.
    pub const DEFAULT_ORDER: [ProviderName; 4] = [
        ProviderName::Anthropic,
        ProviderName::OpenAi,
        ProviderName::Gemini,
        ProviderName::DeepSeek,
    ];

    pub fn new(chain: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self {
            chain,
            failure_counts: Mutex::new(HashMap::new()),
            max_retries: 3,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Run `f` against each provider in the chain in order, skipping any
    /// whose failure count has reached `max_retries`. Resets the
    /// succeeding provider's failure count to zero. If every provider
    /// fails, returns an error listing all underlying messages.
    pub async fn execute<F, Fut, T>(&self, task_name: &str, f: F) -> Result<T>
    where
        F: FnMut(Arc<dyn ProviderAdapter>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_over(task_name, &self.chain, f).await
    }

    /// Like `execute`, but walks the chain's providers reordered to
    /// match `preference_order` (typically `Router::preference_order`
    /// for the task at hand) instead of the chain's own fixed order.
    /// Providers named in `preference_order` but absent from this chain
    /// are skipped; providers in the chain but not named are tried last,
    /// in their original chain order. Failure-count bookkeeping is keyed
    /// by provider name, so reordering the walk never disturbs it.
    pub async fn execute_for_task<F, Fut, T>(&self, task_name: &str, preference_order: &[ProviderName], f: F) -> Result<T>
    where
        F: FnMut(Arc<dyn ProviderAdapter>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let ordered = self.reorder(preference_order);
        self.execute_over(task_name, &ordered, f).await
    }

    fn reorder(&self, preference_order: &[ProviderName]) -> Vec<Arc<dyn ProviderAdapter>> {
        let mut ordered: Vec<Arc<dyn ProviderAdapter>> = Vec::with_capacity(self.chain.len());
        for name in preference_order {
            if let Some(provider) = self.chain.iter().find(|p| p.name() == *name) {
                ordered.push(Arc::clone(provider));
            }
        }
        for provider in &self.chain {
            if !ordered.iter().any(|p| p.name() == provider.name()) {
                ordered.push(Arc::clone(provider));
            }
        }
        ordered
    }

    async fn execute_over<F, Fut, T>(&self, task_name: &str, providers: &[Arc<dyn ProviderAdapter>], mut f: F) -> Result<T>
    where
        F: FnMut(Arc<dyn ProviderAdapter>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut errors = Vec::new();

        for provider in providers {
            let name = provider.name();
            if self.failure_count(name) >= self.max_retries {
                tracing::debug!(provider = %name, task = task_name, "skipping provider, failure cap reached");
                continue;
            }

            match self.call_with_backoff(&mut f, Arc::clone(provider)).await {
                Ok(result) => {
                    self.reset(name);
                    return Ok(result);
                }
                Err(e) => {
                    self.increment_failure(name);
                    tracing::warn!(provider = %name, task = task_name, error = %e, "provider failed, trying next");
                    errors.push(format!("{name}: {e}"));
                }
            }
        }

        Err(OrchestratorError::ProviderTransient(format!(
            "all providers failed for {task_name}: {}",
            errors.join("; ")
        )))
    }

    /// Run one provider call, retrying the same provider on transient
    /// failure per the shared backoff config before moving on in the
    /// chain.
    async fn call_with_backoff<F, Fut, T>(&self, f: &mut F, provider: Arc<dyn ProviderAdapter>) -> Result<T>
    where
        F: FnMut(Arc<dyn ProviderAdapter>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f(Arc::clone(&provider)).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if classify_error(&e) != ErrorClass::Transient || attempt >= self.retry.max_retries {
                        return Err(e);
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn failure_count(&self, name: ProviderName) -> u32 {
        *self.failure_counts.lock().get(&name).unwrap_or(&0)
    }

    fn increment_failure(&self, name: ProviderName) {
        *self.failure_counts.lock().entry(name).or_insert(0) += 1;
    }

    /// Explicitly clear one provider's failure count.
    pub fn reset(&self, name: ProviderName) {
        self.failure_counts.lock().remove(&name);
    }

    /// Explicitly clear every provider's failure count.
    pub fn reset_all(&self) {
        self.failure_counts.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::adapter::Capability;
    use async_trait::async_trait;

    struct FlakyProvider {
        name: ProviderName,
    }

    #[async_trait]
    impl ProviderAdapter for FlakyProvider {
        fn name(&self) -> ProviderName {
            self.name
        }
        fn display_name(&self) -> &'static str {
            "flaky"
        }
        fn capabilities(&self) -> &[Capability] {
            &[]
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn generate_code(&self, _prompt: &str) -> Result<String> {
            Ok("ok".into())
        }
        async fn analyze_intent(&self, _text: &str) -> Result<String> {
            Ok("ok".into())
        }
        async fn enrich_math(&self, _concept: &str) -> Result<String> {
            Ok("ok".into())
        }
        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn falls_over_to_next_provider_on_permanent_failure() {
        let first = Arc::new(FlakyProvider { name: ProviderName::Anthropic });
        let second = Arc::new(FlakyProvider { name: ProviderName::OpenAi });

        let chain = FallbackChain::new(vec![first, second]);

        let result = chain
            .execute("code_generation", |provider| async move {
                if provider.name() == ProviderName::Anthropic {
                    Err(OrchestratorError::ProviderPermanent("invalid api key".into()))
                } else {
                    Ok("generated".to_string())
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "generated");
        assert_eq!(chain.failure_count(ProviderName::Anthropic), 1);
    }

    #[tokio::test]
    async fn all_providers_failing_returns_aggregate_error() {
        let provider = Arc::new(FlakyProvider { name: ProviderName::Anthropic });
        let chain = FallbackChain::new(vec![provider]).with_max_retries(1);

        let result: Result<String> = chain
            .execute("code_generation", |_provider| async {
                Err(OrchestratorError::ProviderPermanent("down".into()))
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn provider_at_failure_cap_is_skipped() {
        let provider = Arc::new(FlakyProvider { name: ProviderName::Anthropic });
        let chain = FallbackChain::new(vec![provider]).with_max_retries(1);
        chain.increment_failure(ProviderName::Anthropic);

        let result: Result<String> = chain
            .execute("code_generation", |_provider| async { Ok("should not be called".to_string()) })
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn reset_clears_failure_count() {
        let chain = FallbackChain::new(vec![]);
        chain.increment_failure(ProviderName::Anthropic);
        assert_eq!(chain.failure_count(ProviderName::Anthropic), 1);
        chain.reset(ProviderName::Anthropic);
        assert_eq!(chain.failure_count(ProviderName::Anthropic), 0);
    }

    #[tokio::test]
    async fn execute_for_task_honors_the_given_preference_order() {
        let anthropic = Arc::new(FlakyProvider { name: ProviderName::Anthropic });
        let gemini = Arc::new(FlakyProvider { name: ProviderName::Gemini });
        let chain = FallbackChain::new(vec![anthropic, gemini]);

        // Math enrichment prefers Gemini before Anthropic; the chain's
        // own construction order is the opposite.
        let order = [ProviderName::Gemini, ProviderName::DeepSeek, ProviderName::Anthropic];
        let result = chain
            .execute_for_task("math_enrichment", &order, |provider| async move { Ok(provider.name()) })
            .await
            .unwrap();

        assert_eq!(result, ProviderName::Gemini);
    }

    #[test]
    fn reorder_appends_chain_providers_missing_from_the_preference_list() {
        let anthropic = Arc::new(FlakyProvider { name: ProviderName::Anthropic });
        let openai = Arc::new(FlakyProvider { name: ProviderName::OpenAi });
        let chain = FallbackChain::new(vec![anthropic, openai]);

        let ordered = chain.reorder(&[ProviderName::OpenAi]);
        let names: Vec<ProviderName> = ordered.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec![ProviderName::OpenAi, ProviderName::Anthropic]);
    }
}
