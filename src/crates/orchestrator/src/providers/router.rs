//! Task-capability router: `map[task -> []providerName]`.
//!
//! Distinct from the fallback chain: the router only picks a preference
//! order per task type; the chain does the actual failover walk.

use super::adapter::{ProviderAdapter, ProviderName};
use std::collections::HashMap;
use std::sync::Arc;

/// A pipeline task type requiring a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    CodeGeneration,
    IntentAnalysis,
    MathEnrichment,
    Creative,
}

/// Maps task types to an ordered list of preferred providers.
pub struct Router {
    providers: HashMap<ProviderName, Arc<dyn ProviderAdapter>>,
    preferences: HashMap<Task, Vec<ProviderName>>,
}

impl Router {
    /// Build a router with the default preference table from the
    /// federation design.
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name(), p))
            .collect::<HashMap<_, _>>();

        let mut preferences = HashMap::new();
        preferences.insert(
            Task::CodeGeneration,
            vec![ProviderName::Anthropic, ProviderName::OpenAi, ProviderName::DeepSeek],
        );
        preferences.insert(
            Task::IntentAnalysis,
            vec![ProviderName::Anthropic, ProviderName::OpenAi, ProviderName::Gemini],
        );
        preferences.insert(
            Task::MathEnrichment,
            vec![ProviderName::Gemini, ProviderName::DeepSeek, ProviderName::Anthropic],
        );
        preferences.insert(Task::Creative, vec![ProviderName::Anthropic, ProviderName::OpenAi]);

        Self { providers, preferences }
    }

    /// Override the preference list for a task (used in tests and by
    /// operators who want a different default ordering).
    pub fn with_preference(mut self, task: Task, order: Vec<ProviderName>) -> Self {
        self.preferences.insert(task, order);
        self
    }

    /// Walk the preferred list for `task`, returning the first available
    /// provider. Falls back to walking every registered provider if none
    /// of the preferred ones are available. Returns `None` if nothing is
    /// available anywhere.
    pub async fn get_provider(&self, task: Task) -> Option<Arc<dyn ProviderAdapter>> {
        if let Some(order) = self.preferences.get(&task) {
            for name in order {
                if let Some(provider) = self.providers.get(name) {
                    if provider.is_available().await {
                        return Some(Arc::clone(provider));
                    }
                }
            }
        }

        for provider in self.providers.values() {
            if provider.is_available().await {
                return Some(Arc::clone(provider));
            }
        }

        None
    }

    /// The preference list configured for a task, for building the
    /// fallback chain.
    pub fn preference_order(&self, task: Task) -> Vec<ProviderName> {
        self.preferences.get(&task).cloned().unwrap_or_default()
    }

    pub fn provider(&self, name: ProviderName) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(&name).cloned()
    }
}
