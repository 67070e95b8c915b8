//! Fourth pipeline stage: turn the enriched content into a timed visual
//! plan — color palette, typography, a contiguous sequence of beats, and
//! camera keyframes.

use crate::domain::{
    Beat, BeatType, ColorPalette, Easing, KnowledgeTree, Keyframe, MathEnrichment, Tone, Typography,
    VisualDesign,
};
use crate::events::{Event, Handler, Payload, Topic};
use crate::job::Style;
use async_trait::async_trait;
use std::sync::Arc;

/// Base duration of a single non-transition beat before the style's
/// pacing multiplier.
const BASE_BEAT_SECONDS: f64 = 4.0;

/// Transition beats are much shorter than content beats: half a pacing
/// unit rather than a full `BASE_BEAT_SECONDS`.
const TRANSITION_PACING_FRACTION: f64 = 0.5;

pub struct VisualDesigner {
    event_bus: Arc<crate::events::EventBus>,
}

impl VisualDesigner {
    pub fn new(event_bus: Arc<crate::events::EventBus>) -> Self {
        Self { event_bus }
    }

    fn palette_for(style: Style) -> ColorPalette {
        let (primary, secondary, accent, background) = match style {
            Style::ThreeBlue1Brown => ("#3B82F6", "#1E3A8A", "#F59E0B", "#111827"),
            Style::Minimalist => ("#111827", "#6B7280", "#111827", "#FFFFFF"),
            Style::Playful => ("#EC4899", "#8B5CF6", "#F59E0B", "#FDF2F8"),
            Style::Cinematic => ("#0F172A", "#334155", "#F59E0B", "#000000"),
            Style::Technical => ("#0EA5E9", "#1E293B", "#10B981", "#0B1120"),
        };

        ColorPalette {
            primary: primary.into(),
            secondary: secondary.into(),
            accent: accent.into(),
            background: background.into(),
            text: "#FFFFFF".into(),
            highlight: accent.into(),
            custom: std::collections::HashMap::new(),
        }
    }

    fn typography_for(style: Style) -> Typography {
        match style {
            Style::ThreeBlue1Brown => Typography { title_font: "CMU Serif".into(), body_font: "CMU Serif".into(), base_size: 36.0, scale_ratio: 1.3 },
            Style::Minimalist => Typography { title_font: "Helvetica".into(), body_font: "Helvetica".into(), base_size: 32.0, scale_ratio: 1.2 },
            Style::Playful => Typography { title_font: "Comic Sans MS".into(), body_font: "Comic Sans MS".into(), base_size: 40.0, scale_ratio: 1.4 },
            Style::Cinematic => Typography { title_font: "Futura".into(), body_font: "Futura".into(), base_size: 38.0, scale_ratio: 1.35 },
            Style::Technical => Typography { title_font: "Fira Code".into(), body_font: "Fira Code".into(), base_size: 30.0, scale_ratio: 1.25 },
        }
    }

    /// Beat types forming one full narrative sweep: intro, setup (only
    /// when the tree has more than one node), one explanation beat per
    /// learning-path node — the last one relabeled `climax` — interleaved
    /// with `transition` beats, then reveal, demonstration, resolution,
    /// conclusion.
    fn beat_sequence(node_count: usize) -> Vec<BeatType> {
        let mut sequence = vec![BeatType::Intro];
        if node_count > 1 {
            sequence.push(BeatType::Setup);
        }

        let explanation_count = node_count.max(1);
        for i in 0..explanation_count {
            if i == explanation_count - 1 {
                sequence.push(BeatType::Climax);
            } else {
                sequence.push(BeatType::Explanation);
                sequence.push(BeatType::Transition);
            }
        }

        sequence.push(BeatType::Reveal);
        sequence.push(BeatType::Demonstration);
        sequence.push(BeatType::Resolution);
        sequence.push(BeatType::Conclusion);
        sequence
    }

    fn tone_for(beat_type: BeatType) -> Tone {
        match beat_type {
            BeatType::Intro => Tone::Curious,
            BeatType::Setup => Tone::Calm,
            BeatType::Explanation => Tone::Contemplative,
            BeatType::Reveal => Tone::Excited,
            BeatType::Demonstration => Tone::Excited,
            BeatType::Climax => Tone::Triumphant,
            BeatType::Resolution => Tone::Calm,
            BeatType::Transition => Tone::Neutral,
            BeatType::Conclusion => Tone::Triumphant,
            BeatType::Pause => Tone::Neutral,
        }
    }

    /// Build a contiguous beat timeline. Transition beats get a short
    /// fixed duration; every other beat gets `BASE_BEAT_SECONDS`. Both are
    /// scaled by the style's pacing multiplier. Explanation and climax
    /// beats pick up their content id from the learning path, in order.
    fn build_beats(style: Style, tree: &KnowledgeTree, enrichment: &MathEnrichment) -> Vec<Beat> {
        let multiplier = style.pacing_multiplier();
        let mut time = 0.0;
        let mut explanation_idx = 0usize;

        Self::beat_sequence(tree.learning_path.len())
            .into_iter()
            .enumerate()
            .map(|(i, beat_type)| {
                let duration = if beat_type == BeatType::Transition {
                    TRANSITION_PACING_FRACTION * multiplier
                } else {
                    BASE_BEAT_SECONDS * multiplier
                };

                let content_ids = match beat_type {
                    BeatType::Explanation | BeatType::Climax => {
                        let ids = tree
                            .learning_path
                            .get(explanation_idx)
                            .cloned()
                            .into_iter()
                            .collect();
                        explanation_idx += 1;
                        ids
                    }
                    _ => enrichment.equations.get(i).map(|e| vec![e.id.clone()]).unwrap_or_default(),
                };

                let beat = Beat {
                    id: format!("beat-{i}"),
                    time,
                    duration,
                    beat_type,
                    tone: Self::tone_for(beat_type),
                    animations: vec![format!("animate:{:?}", beat_type).to_lowercase()],
                    content_ids,
                    camera_keyframe: None,
                };
                time += duration;
                beat
            })
            .collect()
    }

    /// One keyframe per non-transition beat, zooming in toward the climax
    /// and back out for the resolution; rotation only applied when the
    /// style allows it.
    fn build_camera_keyframes(style: Style, beats: &[Beat]) -> Vec<Keyframe> {
        let max_zoom = style.max_zoom();
        beats
            .iter()
            .filter(|beat| beat.beat_type != BeatType::Transition)
            .map(|beat| {
                let zoom = match beat.beat_type {
                    BeatType::Climax | BeatType::Reveal => max_zoom,
                    BeatType::Intro | BeatType::Conclusion => 1.0,
                    _ => 1.0 + (max_zoom - 1.0) * 0.4,
                };
                Keyframe {
                    time: beat.time,
                    x: 0.0,
                    y: 0.0,
                    z: None,
                    zoom,
                    rotation: if style.allows_rotation() { beat.time * 2.0 } else { 0.0 },
                    phi: None,
                    theta: None,
                    easing: Easing::EaseInOut,
                    duration: beat.duration,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Handler for VisualDesigner {
    async fn handle(&self, event: Event) {
        let Payload::MathEnriched { context, tree, enrichment } = &*event.payload else { return };
        let context = context.clone();
        let tree = tree.clone();
        let enrichment = enrichment.clone();

        let beats = Self::build_beats(context.style, &tree, &enrichment);
        let total_duration = beats.last().map(|b| b.time + b.duration).unwrap_or(0.0);
        let camera_keyframes = Self::build_camera_keyframes(context.style, &beats);

        let design = VisualDesign {
            color_palette: Self::palette_for(context.style),
            typography: Self::typography_for(context.style),
            timing_beats: beats,
            camera_keyframes,
            transitions: vec!["fade".into(), "slide".into()],
            is_3d: matches!(context.style, Style::Cinematic | Style::ThreeBlue1Brown),
            total_duration,
        };
        debug_assert!(design.beats_are_contiguous());

        self.event_bus
            .publish(Event::new(
                Topic::VisualDesigned,
                event.job_id.clone(),
                Payload::VisualDesigned { context, tree, enrichment, design },
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Equation, KnowledgeNode};

    fn enrichment_with_equations(n: usize) -> MathEnrichment {
        let mut e = MathEnrichment::empty();
        for i in 0..n {
            e.equations.push(Equation {
                id: format!("eq-{i}"),
                expression: "x".into(),
                description: "d".into(),
                tags: vec![],
            });
        }
        e
    }

    fn tree_with_nodes(n: usize) -> KnowledgeTree {
        let mut root = KnowledgeNode::new("root", "root concept", "d", 0.8, 30, 0);
        let children: Vec<Arc<KnowledgeNode>> = (0..n.saturating_sub(1))
            .map(|i| Arc::new(KnowledgeNode::new(format!("c{i}"), format!("concept-{i}"), "d", 0.5, 10, 1)))
            .collect();
        root = root.with_prerequisites(children);
        KnowledgeTree::new(Arc::new(root))
    }

    #[test]
    fn beats_are_contiguous_for_every_style() {
        for style in [Style::ThreeBlue1Brown, Style::Minimalist, Style::Playful, Style::Cinematic, Style::Technical] {
            let beats = VisualDesigner::build_beats(style, &tree_with_nodes(3), &enrichment_with_equations(2));
            let design = VisualDesign {
                color_palette: VisualDesigner::palette_for(style),
                typography: VisualDesigner::typography_for(style),
                timing_beats: beats,
                camera_keyframes: vec![],
                transitions: vec![],
                is_3d: false,
                total_duration: 0.0,
            };
            assert!(design.beats_are_contiguous(), "{style:?} produced overlapping beats");
        }
    }

    #[test]
    fn styles_that_disallow_rotation_keep_camera_rotation_zero() {
        let beats = VisualDesigner::build_beats(Style::Minimalist, &tree_with_nodes(2), &enrichment_with_equations(1));
        let keyframes = VisualDesigner::build_camera_keyframes(Style::Minimalist, &beats);
        assert!(keyframes.iter().all(|k| k.rotation == 0.0));
    }

    #[test]
    fn setup_beat_only_appears_with_more_than_one_node() {
        let single = VisualDesigner::beat_sequence(1);
        assert!(!single.contains(&BeatType::Setup));

        let multiple = VisualDesigner::beat_sequence(3);
        assert!(multiple.contains(&BeatType::Setup));
    }

    #[test]
    fn last_explanation_beat_is_relabeled_climax_and_transitions_are_interleaved() {
        let sequence = VisualDesigner::beat_sequence(3);
        assert_eq!(sequence.iter().filter(|b| **b == BeatType::Climax).count(), 1);
        assert_eq!(sequence.iter().filter(|b| **b == BeatType::Explanation).count(), 2);
        assert_eq!(sequence.iter().filter(|b| **b == BeatType::Transition).count(), 2);
    }

    #[test]
    fn transition_beats_carry_no_camera_keyframe() {
        let beats = VisualDesigner::build_beats(Style::Technical, &tree_with_nodes(3), &enrichment_with_equations(1));
        let keyframes = VisualDesigner::build_camera_keyframes(Style::Technical, &beats);
        let transition_count = beats.iter().filter(|b| b.beat_type == BeatType::Transition).count();
        assert_eq!(keyframes.len(), beats.len() - transition_count);
    }
}
