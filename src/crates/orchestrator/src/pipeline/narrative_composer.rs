//! Fifth pipeline stage: compose the narrative arc — hook, rising
//! action, climax, resolution, takeaway — from the visual design's
//! beats.

use crate::domain::{
    BeatType, KnowledgeNode, KnowledgeTree, MathEnrichment, Narrative, Segment, StoryArc, Tone,
    VisualDesign,
};
use crate::events::{Event, Handler, Payload, Topic};
use async_trait::async_trait;
use rand::Rng;
use std::fmt::Write as _;
use std::sync::Arc;

const HOOKS: &[&str] = &[
    "Have you ever wondered why this works?",
    "What if everything you knew about this was incomplete?",
    "Here's a question that took mathematicians centuries to answer.",
    "Let's uncover something hiding in plain sight.",
    "There's a pattern here that connects to almost everything else we know.",
];

/// Abstraction over hook selection so tests can pin the choice instead of
/// depending on actual randomness.
pub trait HookPicker: Send + Sync {
    fn pick(&self, hooks: &[&'static str]) -> &'static str;
}

pub struct RandomHookPicker;

impl HookPicker for RandomHookPicker {
    fn pick(&self, hooks: &[&'static str]) -> &'static str {
        let idx = rand::thread_rng().gen_range(0..hooks.len());
        hooks[idx]
    }
}

pub struct NarrativeComposer {
    event_bus: Arc<crate::events::EventBus>,
    hook_picker: Box<dyn HookPicker>,
}

impl NarrativeComposer {
    pub fn new(event_bus: Arc<crate::events::EventBus>) -> Self {
        Self::with_hook_picker(event_bus, Box::new(RandomHookPicker))
    }

    pub fn with_hook_picker(event_bus: Arc<crate::events::EventBus>, hook_picker: Box<dyn HookPicker>) -> Self {
        Self { event_bus, hook_picker }
    }

    fn narration_for(beat_type: BeatType, concept: &str) -> String {
        match beat_type {
            BeatType::Intro => format!("Today we're exploring {concept}."),
            BeatType::Setup => format!("Let's set up the pieces we'll need for {concept}."),
            BeatType::Explanation => format!("Here's how {concept} actually works."),
            BeatType::Reveal => "Now watch what happens when we put it together.".to_string(),
            BeatType::Demonstration => format!("Let's see {concept} in action."),
            BeatType::Climax => "This is the key insight.".to_string(),
            BeatType::Resolution => format!("So that's the full picture of {concept}."),
            BeatType::Transition => "Moving on.".to_string(),
            BeatType::Conclusion => format!("And that's {concept}, from first principles."),
            BeatType::Pause => String::new(),
        }
    }

    fn segment_for(beat: &crate::domain::Beat, concept: &str) -> Segment {
        Segment {
            narration: Self::narration_for(beat.beat_type, concept),
            key_points: beat.content_ids.clone(),
            visual_cues: beat.animations.clone(),
            duration: beat.duration,
            tone: beat.tone,
            rhetorical_question: matches!(beat.beat_type, BeatType::Intro | BeatType::Reveal)
                .then(|| format!("Why does {concept} behave this way?")),
        }
    }

    /// Every node but the root, sorted by descending depth so the deepest
    /// (most foundational) prerequisites lead the rising action.
    fn prerequisite_nodes_by_depth(tree: &KnowledgeTree) -> Vec<Arc<KnowledgeNode>> {
        let mut nodes = Vec::new();
        let mut stack = vec![Arc::clone(&tree.root)];
        while let Some(node) = stack.pop() {
            if !Arc::ptr_eq(&node, &tree.root) {
                nodes.push(Arc::clone(&node));
            }
            stack.extend(node.prerequisites.iter().cloned());
        }
        nodes.sort_by(|a, b| b.depth.cmp(&a.depth));
        nodes
    }

    fn segment_for_node(node: &KnowledgeNode) -> Segment {
        Segment {
            narration: format!("Before we go further, let's ground ourselves in {}.", node.concept),
            key_points: vec![node.description.clone()],
            visual_cues: vec![format!("highlight:{}", node.concept)],
            duration: node.explanation_time as f64,
            tone: Tone::Contemplative,
            rhetorical_question: None,
        }
    }

    fn build_arc(&self, tree: &KnowledgeTree, design: &VisualDesign, concept: &str) -> StoryArc {
        let hook = self.hook_picker.pick(HOOKS).to_string();

        let rising_action: Vec<Segment> = Self::prerequisite_nodes_by_depth(tree)
            .iter()
            .take(4)
            .map(|node| Self::segment_for_node(node))
            .collect();

        let mut resolution = Vec::new();
        let mut climax = String::new();

        for beat in &design.timing_beats {
            match beat.beat_type {
                BeatType::Climax => climax = Self::narration_for(beat.beat_type, concept),
                BeatType::Resolution | BeatType::Conclusion => resolution.push(Self::segment_for(beat, concept)),
                _ => {}
            }
        }

        if climax.is_empty() {
            climax = format!("And here's the heart of {concept}.");
        }

        StoryArc {
            hook,
            rising_action,
            climax,
            resolution,
            takeaway: format!("The key takeaway: {concept} builds on ideas you already understand."),
        }
    }

    /// Deterministic textual serialization of the job's full plan, used as
    /// the code generator's prompt. Sections are delimited so the prompt
    /// reads as a structured document rather than a paragraph.
    fn build_verbose_prompt(
        context: &crate::job::JobContext,
        tree: &KnowledgeTree,
        enrichment: &MathEnrichment,
        design: &VisualDesign,
        arc: &StoryArc,
    ) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "=== CONCEPT ===\n{}\n", context.concept);
        let _ = writeln!(out, "=== STYLE ===\n{:?}\n", context.style);
        let _ = writeln!(out, "=== DURATION ===\n{:.2}s\n", design.total_duration);

        let _ = writeln!(out, "=== OBJECTIVES ===");
        let _ = writeln!(out, "- Understand {}", context.concept);
        let _ = writeln!(out);

        let _ = writeln!(out, "=== NARRATIVE ARC ===");
        let _ = writeln!(out, "Hook: {}", arc.hook);
        for (i, segment) in arc.rising_action.iter().enumerate() {
            let _ = writeln!(out, "Rising action {}: {}", i + 1, segment.narration);
        }
        let _ = writeln!(out, "Climax: {}", arc.climax);
        for (i, segment) in arc.resolution.iter().enumerate() {
            let _ = writeln!(out, "Resolution {}: {}", i + 1, segment.narration);
        }
        let _ = writeln!(out, "Takeaway: {}\n", arc.takeaway);

        let _ = writeln!(out, "=== VISUAL DESIGN ===");
        let _ = writeln!(
            out,
            "Palette: primary {} / secondary {} / accent {}",
            design.color_palette.primary, design.color_palette.secondary, design.color_palette.accent
        );
        let _ = writeln!(out, "Typography: {} / {}", design.typography.title_font, design.typography.body_font);
        let _ = writeln!(out, "Beats: {} ({}3D)\n", design.timing_beats.len(), if design.is_3d { "" } else { "non-" });

        let _ = writeln!(out, "=== MATHEMATICAL CONTENT ===");
        for eq in &enrichment.equations {
            let _ = writeln!(out, "Equation {}: {}", eq.id, eq.expression);
        }
        for theorem in &enrichment.theorems {
            let _ = writeln!(out, "Theorem {}: {}", theorem.name, theorem.statement);
        }
        for def in &enrichment.definitions {
            let _ = writeln!(out, "Definition {}: {}", def.term, def.description);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "=== KNOWLEDGE HIERARCHY ===");
        for node_id in &tree.learning_path {
            let _ = writeln!(out, "- {node_id}");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "=== IMPLEMENTATION INSTRUCTIONS ===");
        let _ = write!(
            out,
            "Write a Python Manim scene named MainScene that realizes the arc and visual design above, \
             paced to a total duration of {:.2}s.",
            design.total_duration
        );

        out
    }
}

#[async_trait]
impl Handler for NarrativeComposer {
    async fn handle(&self, event: Event) {
        let Payload::VisualDesigned { context, tree, enrichment, design } = &*event.payload else { return };
        let context = context.clone();
        let tree = tree.clone();
        let design = design.clone();

        let arc = self.build_arc(&tree, &design, &context.concept);
        let verbose_prompt = Self::build_verbose_prompt(&context, &tree, enrichment, &design, &arc);
        let word_count = verbose_prompt.split_whitespace().count();
        let narrative = Narrative {
            total_duration: design.total_duration,
            learning_objectives: vec![format!("Understand {}", context.concept)],
            verbose_prompt,
            word_count,
            arcs: vec![arc],
        };

        self.event_bus
            .publish(Event::new(
                Topic::NarrativeComposed,
                event.job_id.clone(),
                Payload::NarrativeComposed { context, tree, design, narrative },
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Beat, ColorPalette, Typography};
    use std::collections::HashMap;

    struct FixedHookPicker;
    impl HookPicker for FixedHookPicker {
        fn pick(&self, hooks: &[&'static str]) -> &'static str {
            hooks[0]
        }
    }

    fn tree_with_prerequisites(n: usize) -> KnowledgeTree {
        let children: Vec<Arc<KnowledgeNode>> = (0..n)
            .map(|i| Arc::new(KnowledgeNode::new(format!("c{i}"), format!("concept-{i}"), "d", 0.5, 10, 1)))
            .collect();
        let root = KnowledgeNode::new("root", "root concept", "d", 0.8, 30, 0).with_prerequisites(children);
        KnowledgeTree::new(Arc::new(root))
    }

    fn design_with_beats(beat_types: &[BeatType]) -> VisualDesign {
        let mut time = 0.0;
        let timing_beats = beat_types
            .iter()
            .enumerate()
            .map(|(i, bt)| {
                let beat = Beat {
                    id: format!("beat-{i}"),
                    time,
                    duration: 2.0,
                    beat_type: *bt,
                    tone: Tone::Neutral,
                    animations: vec![],
                    content_ids: vec![],
                    camera_keyframe: None,
                };
                time += 2.0;
                beat
            })
            .collect();

        VisualDesign {
            color_palette: ColorPalette {
                primary: "#000".into(),
                secondary: "#000".into(),
                accent: "#000".into(),
                background: "#000".into(),
                text: "#000".into(),
                highlight: "#000".into(),
                custom: HashMap::new(),
            },
            typography: Typography { title_font: "a".into(), body_font: "a".into(), base_size: 1.0, scale_ratio: 1.0 },
            timing_beats,
            camera_keyframes: vec![],
            transitions: vec![],
            is_3d: false,
            total_duration: time,
        }
    }

    #[test]
    fn hook_picker_is_used_for_the_arc_hook() {
        let bus = crate::events::EventBus::new();
        let composer = NarrativeComposer::with_hook_picker(bus, Box::new(FixedHookPicker));
        let design = design_with_beats(&[BeatType::Intro, BeatType::Resolution]);
        let tree = tree_with_prerequisites(1);
        let arc = composer.build_arc(&tree, &design, "derivatives");
        assert_eq!(arc.hook, HOOKS[0]);
    }

    #[test]
    fn climax_beat_populates_the_climax_field() {
        let bus = crate::events::EventBus::new();
        let composer = NarrativeComposer::with_hook_picker(bus, Box::new(FixedHookPicker));
        let design = design_with_beats(&[BeatType::Intro, BeatType::Climax, BeatType::Resolution]);
        let tree = tree_with_prerequisites(1);
        let arc = composer.build_arc(&tree, &design, "derivatives");
        assert_eq!(arc.climax, "This is the key insight.");
    }

    #[test]
    fn resolution_and_conclusion_beats_land_in_resolution() {
        let bus = crate::events::EventBus::new();
        let composer = NarrativeComposer::with_hook_picker(bus, Box::new(FixedHookPicker));
        let design = design_with_beats(&[BeatType::Setup, BeatType::Resolution, BeatType::Conclusion]);
        let tree = tree_with_prerequisites(2);
        let arc = composer.build_arc(&tree, &design, "derivatives");
        assert_eq!(arc.resolution.len(), 2);
        assert_eq!(arc.rising_action.len(), 2);
    }

    #[test]
    fn rising_action_is_capped_at_four_prerequisite_nodes() {
        let bus = crate::events::EventBus::new();
        let composer = NarrativeComposer::with_hook_picker(bus, Box::new(FixedHookPicker));
        let design = design_with_beats(&[BeatType::Intro, BeatType::Resolution]);
        let tree = tree_with_prerequisites(6);
        let arc = composer.build_arc(&tree, &design, "derivatives");
        assert_eq!(arc.rising_action.len(), 4);
    }
}
