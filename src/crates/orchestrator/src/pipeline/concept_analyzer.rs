//! First pipeline stage: classify intent and extract entities from the
//! raw concept text.

use crate::events::{Event, ExtractedEntities, Handler, Intent, Payload, Topic};
use crate::providers::{FallbackChain, Router, Task};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

fn math_expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-zA-Z0-9]*\s*[=+\-*/^]\s*[a-zA-Z0-9().\s+\-*/^]+").unwrap())
}

const COLOR_WORDS: &[&str] = &[
    "red", "blue", "green", "yellow", "orange", "purple", "pink", "white", "black", "gray", "grey",
];

const ACTION_WORDS: &[&str] = &[
    "rotate", "move", "transform", "scale", "morph", "graph", "plot", "animate", "reveal", "explain",
    "prove", "demonstrate", "visualize",
];

pub struct ConceptAnalyzer {
    event_bus: Arc<crate::events::EventBus>,
    router: Arc<Router>,
    chain: Arc<FallbackChain>,
}

impl ConceptAnalyzer {
    pub fn new(event_bus: Arc<crate::events::EventBus>, router: Arc<Router>, chain: Arc<FallbackChain>) -> Self {
        Self { event_bus, router, chain }
    }

    fn classify_keywords(text: &str) -> Intent {
        let lower = text.to_lowercase();
        if lower.contains("prove") || lower.contains("proof") || lower.contains("theorem") {
            Intent::GeometricProof
        } else if lower.contains("graph") || lower.contains("plot") || lower.contains("function") {
            Intent::GraphFunction
        } else if lower.contains("transform") || lower.contains("morph") || lower.contains("rotate") {
            Intent::TransformObject
        } else if lower.contains("text") || lower.contains("word") || lower.contains("title") {
            Intent::KineticText
        } else if lower.contains("explain") || lower.contains("why") || lower.contains("how") {
            Intent::ExplainConcept
        } else if lower.contains("scene") || lower.contains("world") || lower.contains("story") {
            Intent::CreateScene
        } else {
            Intent::VisualizeMath
        }
    }

    fn extract_entities(text: &str) -> ExtractedEntities {
        let lower = text.to_lowercase();
        let colors = COLOR_WORDS.iter().filter(|c| lower.contains(*c)).map(|c| c.to_string()).collect();
        let actions = ACTION_WORDS.iter().filter(|a| lower.contains(*a)).map(|a| a.to_string()).collect();
        let math_expressions = math_expression_pattern()
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let objects = text
            .split_whitespace()
            .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        ExtractedEntities { objects, actions, colors, math_expressions }
    }

    fn skill_tag(intent: Intent) -> &'static str {
        match intent {
            Intent::VisualizeMath => "math-visualization",
            Intent::ExplainConcept => "concept-explanation",
            Intent::TransformObject => "object-transform",
            Intent::GraphFunction => "function-graphing",
            Intent::GeometricProof => "geometric-proof",
            Intent::KineticText => "kinetic-typography",
            Intent::CreateScene => "scene-composition",
        }
    }
}

#[async_trait]
impl Handler for ConceptAnalyzer {
    async fn handle(&self, event: Event) {
        let Payload::ConceptSubmitted { concept, quality, style, use_smart_mode } = &*event.payload else {
            return;
        };
        let context = crate::job::JobContext {
            concept: concept.clone(),
            quality: *quality,
            style: *style,
            use_smart_mode: *use_smart_mode,
        };

        let keyword_intent = Self::classify_keywords(concept);
        let mut intent = keyword_intent;
        let mut confidence = 0.7;

        if *use_smart_mode {
            let order = self.router.preference_order(Task::IntentAnalysis);
            let result = self
                .chain
                .execute_for_task("intent_analysis", &order, |provider| {
                    let concept = concept.clone();
                    async move { provider.analyze_intent(&concept).await }
                })
                .await;

            match result {
                Ok(label) => {
                    intent = Self::classify_keywords(&label);
                    confidence = 0.9;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "intent analysis provider federation failed, falling back to CREATE_SCENE");
                    intent = Intent::CreateScene;
                    confidence = 0.5;
                }
            }
        }

        let entities = Self::extract_entities(concept);
        let skill_tag = Self::skill_tag(intent).to_string();

        self.event_bus
            .publish(Event::new(
                Topic::ConceptAnalyzed,
                event.job_id.clone(),
                Payload::ConceptAnalyzed { context, intent, confidence, entities, skill_tag },
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Router;

    #[test]
    fn classifies_proof_requests() {
        assert_eq!(ConceptAnalyzer::classify_keywords("prove the pythagorean theorem"), Intent::GeometricProof);
    }

    #[tokio::test]
    async fn smart_mode_with_no_provider_falls_back_to_create_scene() {
        let bus = crate::events::EventBus::new();
        let router = Arc::new(Router::new(Vec::new()));
        let chain = Arc::new(FallbackChain::new(Vec::new()));
        bus.register_publisher(Topic::ConceptAnalyzed).unwrap();
        let analyzer = ConceptAnalyzer::new(Arc::clone(&bus), router, chain);

        struct Capture(std::sync::Mutex<Option<(Intent, f64)>>);
        #[async_trait]
        impl Handler for Capture {
            async fn handle(&self, event: Event) {
                if let Payload::ConceptAnalyzed { intent, confidence, .. } = &*event.payload {
                    *self.0.lock().unwrap() = Some((*intent, *confidence));
                }
            }
        }
        let capture = Arc::new(Capture(std::sync::Mutex::new(None)));
        bus.subscribe(Topic::ConceptAnalyzed, Arc::clone(&capture) as Arc<dyn Handler>).await;

        analyzer
            .handle(Event::new(
                Topic::ConceptSubmitted,
                "job-1",
                Payload::ConceptSubmitted {
                    concept: "derivative".into(),
                    quality: crate::job::Quality::Medium,
                    style: crate::job::Style::Minimalist,
                    use_smart_mode: true,
                },
            ))
            .await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let result = capture.0.lock().unwrap().clone();
        assert_eq!(result, Some((Intent::CreateScene, 0.5)));
    }

    #[test]
    fn classifies_graphing_requests() {
        assert_eq!(ConceptAnalyzer::classify_keywords("graph y = x^2"), Intent::GraphFunction);
    }

    #[test]
    fn falls_back_to_visualize_math() {
        assert_eq!(ConceptAnalyzer::classify_keywords("the unit circle"), Intent::VisualizeMath);
    }

    #[test]
    fn extracts_colors_and_math_expressions() {
        let entities = ConceptAnalyzer::extract_entities("rotate a red square where y = x + 1");
        assert!(entities.colors.contains(&"red".to_string()));
        assert!(entities.actions.contains(&"rotate".to_string()));
        assert!(!entities.math_expressions.is_empty());
    }
}
