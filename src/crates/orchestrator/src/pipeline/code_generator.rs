//! Sixth pipeline stage: turn the narrative and visual design into
//! executable Manim scene code.
//!
//! Provider federation is tried first with the verbose prompt; its
//! output is post-processed to extract a fenced code block and must
//! define `MainScene`. If the provider is unavailable, errors, or
//! returns code with no `MainScene`, a built-in template catalogue
//! (keyed by substring match on well-known shapes) is tried as a
//! fallback with `usedAI = false`. If neither source produces a valid
//! scene, the job fails rather than silently emitting empty content.

use crate::events::{Event, Handler, Payload, Topic};
use crate::providers::{FallbackChain, Router, Task};
use async_trait::async_trait;
use std::sync::Arc;

/// Named fallback scenes for concepts the static pipeline can recognize
/// on its own, tried only once provider federation has failed.
const TEMPLATE_CATALOGUE: &[(&str, &str, &str)] = &[
    (
        "mobius",
        "Mobius Strip",
        "from manim import *\nfrom manim.opengl import *\n\n\nclass MainScene(ThreeDScene):\n    def construct(self):\n        self.set_camera_orientation(phi=70 * DEGREES, theta=-45 * DEGREES)\n        strip = Surface(\n            lambda u, v: np.array([\n                (1 + v / 2 * np.cos(u / 2)) * np.cos(u),\n                (1 + v / 2 * np.cos(u / 2)) * np.sin(u),\n                v / 2 * np.sin(u / 2),\n            ]),\n            u_range=[0, TAU],\n            v_range=[-1, 1],\n        )\n        self.play(Create(strip))\n        self.wait(2)\n",
    ),
    (
        "klein",
        "Klein Bottle",
        "from manim import *\nfrom manim.opengl import *\n\n\nclass MainScene(ThreeDScene):\n    def construct(self):\n        self.set_camera_orientation(phi=70 * DEGREES, theta=-45 * DEGREES)\n        bottle = Surface(\n            lambda u, v: np.array([\n                (2 + np.cos(u / 2) * np.sin(v) - np.sin(u / 2) * np.sin(2 * v)) * np.cos(u),\n                (2 + np.cos(u / 2) * np.sin(v) - np.sin(u / 2) * np.sin(2 * v)) * np.sin(u),\n                np.sin(u / 2) * np.sin(v) + np.cos(u / 2) * np.sin(2 * v),\n            ]),\n            u_range=[0, TAU],\n            v_range=[0, TAU],\n        )\n        self.play(Create(bottle))\n        self.wait(2)\n",
    ),
    (
        "torus knot",
        "Torus Knot",
        "from manim import *\nfrom manim.opengl import *\n\n\nclass MainScene(ThreeDScene):\n    def construct(self):\n        self.set_camera_orientation(phi=70 * DEGREES, theta=-45 * DEGREES)\n        knot = ParametricFunction(\n            lambda t: np.array([\n                np.cos(2 * t) * (2 + np.cos(3 * t)),\n                np.sin(2 * t) * (2 + np.cos(3 * t)),\n                np.sin(3 * t),\n            ]),\n            t_range=[0, TAU],\n        )\n        self.play(Create(knot))\n        self.wait(2)\n",
    ),
];

pub struct CodeGenerator {
    event_bus: Arc<crate::events::EventBus>,
    router: Arc<Router>,
    chain: Arc<FallbackChain>,
}

impl CodeGenerator {
    pub fn new(event_bus: Arc<crate::events::EventBus>, router: Arc<Router>, chain: Arc<FallbackChain>) -> Self {
        Self { event_bus, router, chain }
    }

    fn contains_main_scene(code: &str) -> bool {
        code.contains("class MainScene")
    }

    /// Extract a fenced code block (```python ... ``` or generic
    /// ``` ... ```) from `raw` if present; otherwise trim whitespace.
    fn extract_code(raw: &str) -> String {
        if let Some(start) = raw.find("```") {
            let after_fence = &raw[start + 3..];
            let body_start = after_fence
                .find('\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let body = &after_fence[body_start..];
            if let Some(end) = body.find("```") {
                return body[..end].trim().to_string();
            }
        }
        raw.trim().to_string()
    }

    /// The first catalogue entry whose keyword appears as a substring
    /// of the lowercased concept, if any.
    fn matching_template(concept: &str) -> Option<&'static str> {
        let lower = concept.to_lowercase();
        TEMPLATE_CATALOGUE
            .iter()
            .find(|(keyword, _, _)| lower.contains(keyword))
            .map(|(_, _, code)| *code)
    }
}

#[async_trait]
impl Handler for CodeGenerator {
    async fn handle(&self, event: Event) {
        let Payload::NarrativeComposed { context, narrative, .. } = &*event.payload else { return };
        let context = context.clone();

        let mut ai_code: Option<String> = None;
        if context.use_smart_mode {
            let prompt = format!(
                "Write a Python Manim scene named MainScene that visualizes: {}. \
                 Narration: {}",
                context.concept, narrative.verbose_prompt
            );
            let order = self.router.preference_order(Task::CodeGeneration);
            let result = self
                .chain
                .execute_for_task("code_generation", &order, |provider| {
                    let prompt = prompt.clone();
                    async move { provider.generate_code(&prompt).await }
                })
                .await;

            match result {
                Ok(generated) => {
                    let extracted = Self::extract_code(&generated);
                    if Self::contains_main_scene(&extracted) {
                        ai_code = Some(extracted);
                    } else {
                        tracing::warn!(job_id = %event.job_id, "ai code had no MainScene defined");
                    }
                }
                Err(e) => {
                    tracing::warn!(job_id = %event.job_id, error = %e, "code generation provider federation failed");
                }
            }
        }

        let (code, used_ai, generation_type) = if let Some(code) = ai_code {
            (code, true, "ai".to_string())
        } else if let Some(template) = Self::matching_template(&context.concept) {
            (template.to_string(), false, "template".to_string())
        } else {
            self.event_bus
                .publish(Event::new(
                    Topic::VideoFailed,
                    event.job_id.clone(),
                    Payload::VideoFailed {
                        error: "no MainScene defined".to_string(),
                        details: Some(format!(
                            "code generation produced no usable scene for \"{}\" and no built-in template matched",
                            context.concept
                        )),
                    },
                ))
                .await;
            return;
        };

        self.event_bus
            .publish(Event::new(
                Topic::CodeGenerated,
                event.job_id.clone(),
                Payload::CodeGenerated { context, code, used_ai, generation_type },
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_missing_main_scene() {
        assert!(!CodeGenerator::contains_main_scene("class OtherScene(Scene): pass"));
        assert!(CodeGenerator::contains_main_scene("class MainScene(Scene): pass"));
    }

    #[test]
    fn extracts_a_python_fenced_code_block() {
        let raw = "Sure, here you go:\n```python\nclass MainScene(Scene):\n    def construct(self):\n        pass\n```\nHope that helps.";
        let code = CodeGenerator::extract_code(raw);
        assert_eq!(code, "class MainScene(Scene):\n    def construct(self):\n        pass");
    }

    #[test]
    fn extracts_a_generic_fenced_code_block() {
        let raw = "```\nclass MainScene(Scene):\n    pass\n```";
        let code = CodeGenerator::extract_code(raw);
        assert_eq!(code, "class MainScene(Scene):\n    pass");
    }

    #[test]
    fn falls_back_to_trimmed_text_with_no_fence() {
        let raw = "  class MainScene(Scene): pass  ";
        assert_eq!(CodeGenerator::extract_code(raw), "class MainScene(Scene): pass");
    }

    #[test]
    fn matches_known_shapes_in_the_template_catalogue() {
        assert!(CodeGenerator::matching_template("a Mobius strip twisting through space").is_some());
        assert!(CodeGenerator::matching_template("a Klein bottle in 3D").is_some());
        assert!(CodeGenerator::matching_template("a torus knot").is_some());
        assert!(CodeGenerator::matching_template("supply chain logistics").is_none());
    }

    #[test]
    fn catalogue_templates_all_define_main_scene() {
        for (_, name, code) in TEMPLATE_CATALOGUE {
            assert!(CodeGenerator::contains_main_scene(code), "{name} template missing MainScene");
        }
    }

    fn narrative_composed_event(job_id: &str, concept: &str, use_smart_mode: bool) -> Event {
        let context = crate::job::JobContext {
            concept: concept.to_string(),
            quality: crate::job::Quality::Medium,
            style: crate::job::Style::Minimalist,
            use_smart_mode,
        };
        let tree = crate::domain::KnowledgeTree::new(Arc::new(crate::domain::KnowledgeNode::new(
            "root", concept, "d", 0.8, 30, 0,
        )));
        let design = crate::domain::VisualDesign {
            color_palette: crate::domain::ColorPalette {
                primary: "#000".into(),
                secondary: "#000".into(),
                accent: "#000".into(),
                background: "#000".into(),
                text: "#000".into(),
                highlight: "#000".into(),
                custom: std::collections::HashMap::new(),
            },
            typography: crate::domain::Typography { title_font: "a".into(), body_font: "a".into(), base_size: 1.0, scale_ratio: 1.0 },
            timing_beats: vec![],
            camera_keyframes: vec![],
            transitions: vec![],
            is_3d: false,
            total_duration: 1.0,
        };
        let narrative = crate::domain::Narrative {
            arcs: vec![],
            total_duration: 1.0,
            learning_objectives: vec![],
            verbose_prompt: "p".into(),
            word_count: 1,
        };
        Event::new(
            Topic::NarrativeComposed,
            job_id,
            Payload::NarrativeComposed { context, tree, design, narrative },
        )
    }

    #[tokio::test]
    async fn falls_back_to_catalogue_template_when_no_provider_is_available() {
        let bus = crate::events::EventBus::new();
        bus.register_publisher(Topic::CodeGenerated).unwrap();
        let router = Arc::new(Router::new(Vec::new()));
        let chain = Arc::new(FallbackChain::new(Vec::new()));
        let generator = CodeGenerator::new(Arc::clone(&bus), router, chain);

        struct Capture(std::sync::Mutex<Option<(bool, String)>>);
        #[async_trait]
        impl Handler for Capture {
            async fn handle(&self, event: Event) {
                if let Payload::CodeGenerated { used_ai, generation_type, .. } = &*event.payload {
                    *self.0.lock().unwrap() = Some((*used_ai, generation_type.clone()));
                }
            }
        }
        let capture = Arc::new(Capture(std::sync::Mutex::new(None)));
        bus.subscribe(Topic::CodeGenerated, Arc::clone(&capture) as Arc<dyn Handler>).await;

        generator.handle(narrative_composed_event("job-1", "a Klein bottle", false)).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let result = capture.0.lock().unwrap().clone();
        assert_eq!(result, Some((false, "template".to_string())));
    }

    #[tokio::test]
    async fn fails_the_job_when_no_provider_and_no_catalogue_match() {
        let bus = crate::events::EventBus::new();
        bus.register_publisher(Topic::CodeGenerated).unwrap();
        bus.register_publisher(Topic::VideoFailed).unwrap();
        let router = Arc::new(Router::new(Vec::new()));
        let chain = Arc::new(FallbackChain::new(Vec::new()));
        let generator = CodeGenerator::new(Arc::clone(&bus), router, chain);

        struct Capture(std::sync::Mutex<Option<String>>);
        #[async_trait]
        impl Handler for Capture {
            async fn handle(&self, event: Event) {
                if let Payload::VideoFailed { error, .. } = &*event.payload {
                    *self.0.lock().unwrap() = Some(error.clone());
                }
            }
        }
        let capture = Arc::new(Capture(std::sync::Mutex::new(None)));
        bus.subscribe(Topic::VideoFailed, Arc::clone(&capture) as Arc<dyn Handler>).await;

        generator.handle(narrative_composed_event("job-1", "supply chain logistics", false)).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(capture.0.lock().unwrap().clone(), Some("no MainScene defined".to_string()));
    }
}
