//! Second pipeline stage: build the bounded-depth prerequisite tree.
//!
//! If the provider call for a given node fails partway through the
//! expansion, the tree built so far is kept and returned rather than
//! discarded — a partial learning path is strictly more useful to the
//! downstream stages than none, and the failure is logged rather than
//! propagated as a pipeline failure.

use crate::domain::{KnowledgeNode, KnowledgeTree, MAX_DEPTH};
use crate::events::{Event, Handler, Payload, Topic};
use crate::providers::{FallbackChain, Router, Task};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Built-in prerequisites keyed by substring match on the concept, used
/// when the provider is unavailable or fails. Checked in order; the
/// first key that appears as a substring of the (lowercased) concept
/// wins.
const FALLBACK_RULES: &[(&str, &[&str])] = &[
    ("derivative", &["limits", "functions", "slopes"]),
    ("integral", &["derivatives", "area", "summation"]),
    ("limit", &["functions", "sequences", "continuity"]),
    ("matrix", &["vectors", "linear equations", "arrays"]),
    ("vector", &["coordinates", "magnitude", "direction"]),
    ("probability", &["sets", "counting", "ratios"]),
    ("function", &["sets", "variables", "relations"]),
];

fn fallback_prerequisites(concept: &str) -> Vec<String> {
    let lowered = concept.to_lowercase();
    FALLBACK_RULES
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, prereqs)| prereqs.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

struct PendingNode {
    id: String,
    concept: String,
    depth: u32,
    children: Vec<usize>,
}

pub struct PrerequisiteExplorer {
    event_bus: Arc<crate::events::EventBus>,
    router: Arc<Router>,
    chain: Arc<FallbackChain>,
}

impl PrerequisiteExplorer {
    pub fn new(event_bus: Arc<crate::events::EventBus>, router: Arc<Router>, chain: Arc<FallbackChain>) -> Self {
        Self { event_bus, router, chain }
    }

    /// Expand one level of prerequisites for `concept`, asking the
    /// provider for 2-4 foundational ideas. Falls back to the built-in
    /// rule table keyed by substring match when provider federation is
    /// unavailable or fails entirely; returns an empty list (not an
    /// error) only when neither source has anything to offer, leaving
    /// this branch a leaf.
    async fn expand(&self, concept: &str, depth: u32) -> Vec<String> {
        if depth >= MAX_DEPTH {
            return Vec::new();
        }
        let prompt = format!("2-4 prerequisites to understand {concept}");
        let order = self.router.preference_order(Task::IntentAnalysis);
        let result = self
            .chain
            .execute_for_task("intent_analysis", &order, |provider| {
                let prompt = prompt.clone();
                async move { provider.analyze_intent(&prompt).await }
            })
            .await;

        match result {
            Ok(text) => {
                let parsed: Vec<String> = text
                    .lines()
                    .map(|line| line.trim_start_matches(['-', '*', '.', ' ']).trim().to_string())
                    .filter(|line| !line.is_empty())
                    .take(4)
                    .collect();
                if parsed.is_empty() {
                    fallback_prerequisites(concept)
                } else {
                    parsed
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, concept, "prerequisite expansion failed, using fallback rule table");
                fallback_prerequisites(concept)
            }
        }
    }

    /// BFS over concepts, guarded by `MAX_DEPTH` and a visited set on
    /// case-insensitive concept names so a prerequisite that reappears
    /// deeper in the tree does not create a cycle or get expanded twice.
    async fn build_node(&self, id_prefix: String, concept: String, depth: u32) -> Arc<KnowledgeNode> {
        let mut nodes = vec![PendingNode { id: id_prefix, concept, depth, children: Vec::new() }];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(nodes[0].concept.to_lowercase());

        let mut queue = VecDeque::new();
        queue.push_back(0usize);

        while let Some(idx) = queue.pop_front() {
            let (concept, depth, id) = (nodes[idx].concept.clone(), nodes[idx].depth, nodes[idx].id.clone());
            let prerequisite_concepts = self.expand(&concept, depth).await;

            for prereq_concept in prerequisite_concepts {
                let key = prereq_concept.to_lowercase();
                if visited.contains(&key) {
                    continue;
                }
                visited.insert(key);

                let child_idx = nodes.len();
                let child_id = format!("{id}-{child_idx}");
                nodes.push(PendingNode { id: child_id, concept: prereq_concept, depth: depth + 1, children: Vec::new() });
                nodes[idx].children.push(child_idx);
                queue.push_back(child_idx);
            }
        }

        // Children are always pushed after their parent, so building in
        // reverse index order guarantees every child is already built.
        let mut built: Vec<Option<Arc<KnowledgeNode>>> = (0..nodes.len()).map(|_| None).collect();
        for idx in (0..nodes.len()).rev() {
            let pending = &nodes[idx];
            let children: Vec<Arc<KnowledgeNode>> = pending
                .children
                .iter()
                .map(|&c| built[c].clone().expect("child built before parent"))
                .collect();
            let fundamental_score = 1.0 - (pending.depth as f64 / (MAX_DEPTH as f64 + 1.0));
            let node = KnowledgeNode::new(&pending.id, &pending.concept, &pending.concept, fundamental_score, 30, pending.depth)
                .with_prerequisites(children);
            built[idx] = Some(Arc::new(node));
        }

        built[0].take().expect("root always built")
    }
}

#[async_trait]
impl Handler for PrerequisiteExplorer {
    async fn handle(&self, event: Event) {
        let Payload::ConceptAnalyzed { context, .. } = &*event.payload else { return };
        let context = context.clone();

        let root = self.build_node("root".to_string(), context.concept.clone(), 0).await;
        let tree = KnowledgeTree::new(root);

        self.event_bus
            .publish(Event::new(
                Topic::PrerequisitesResolved,
                event.job_id.clone(),
                Payload::PrerequisitesResolved { context, tree },
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_provider_and_no_fallback_match_yields_single_leaf_node() {
        let router = Arc::new(Router::new(Vec::new()));
        let chain = Arc::new(FallbackChain::new(Vec::new()));
        let bus = crate::events::EventBus::new();
        let explorer = PrerequisiteExplorer::new(Arc::clone(&bus), router, chain);

        let root = explorer.build_node("root".to_string(), "origami".to_string(), 0).await;
        assert!(root.prerequisites.is_empty());
        assert_eq!(root.depth, 0);
    }

    #[tokio::test]
    async fn no_provider_falls_back_to_the_rule_table() {
        let router = Arc::new(Router::new(Vec::new()));
        let chain = Arc::new(FallbackChain::new(Vec::new()));
        let bus = crate::events::EventBus::new();
        let explorer = PrerequisiteExplorer::new(Arc::clone(&bus), router, chain);

        let root = explorer.build_node("root".to_string(), "derivatives".to_string(), 0).await;
        let concepts: Vec<&str> = root.prerequisites.iter().map(|n| n.concept.as_str()).collect();
        assert_eq!(concepts, vec!["limits", "functions", "slopes"]);
    }

    #[tokio::test]
    async fn repeated_prerequisite_concepts_are_not_expanded_twice() {
        let router = Arc::new(Router::new(Vec::new()));
        let chain = Arc::new(FallbackChain::new(Vec::new()));
        let bus = crate::events::EventBus::new();
        let explorer = PrerequisiteExplorer::new(Arc::clone(&bus), router, chain);

        // "derivative" and "limit" both fall back to rule-table entries
        // that mention "functions"; the visited set must prevent a
        // second "functions" node from being created.
        let root = explorer.build_node("root".to_string(), "derivative".to_string(), 0).await;
        let mut all_concepts = Vec::new();
        let mut stack: Vec<Arc<KnowledgeNode>> = vec![Arc::clone(&root)];
        while let Some(node) = stack.pop() {
            all_concepts.push(node.concept.clone());
            stack.extend(node.prerequisites.iter().cloned());
        }
        let functions_count = all_concepts.iter().filter(|c| c.as_str() == "functions").count();
        assert_eq!(functions_count, 1);
    }
}
