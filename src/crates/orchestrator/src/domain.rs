//! Data model shared across pipeline stages: the knowledge tree, math
//! enrichment, visual design, and narrative types produced by successive
//! agents and threaded through the event bus.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Hard cap on prerequisite-tree depth (root = 0).
pub const MAX_DEPTH: u32 = 3;

/// A node in the prerequisite knowledge tree. Owns its prerequisite
/// children; cycles are disallowed by a visited set during construction,
/// not by this type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: String,
    pub concept: String,
    pub description: String,
    pub fundamental_score: f64,
    pub explanation_time: u32,
    pub depth: u32,
    pub prerequisites: Vec<Arc<KnowledgeNode>>,
    pub explored: bool,
}

impl KnowledgeNode {
    /// Construct a node, clamping fields to their documented bounds.
    pub fn new(
        id: impl Into<String>,
        concept: impl Into<String>,
        description: impl Into<String>,
        fundamental_score: f64,
        explanation_time: u32,
        depth: u32,
    ) -> Self {
        let mut concept = concept.into();
        concept.truncate(50);
        let mut description = description.into();
        description.truncate(200);

        Self {
            id: id.into(),
            concept,
            description,
            fundamental_score: fundamental_score.clamp(0.0, 1.0),
            explanation_time: explanation_time.clamp(5, 120),
            depth,
            prerequisites: Vec::new(),
            explored: false,
        }
    }

    pub(crate) fn with_prerequisites(mut self, prerequisites: Vec<Arc<KnowledgeNode>>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    /// Recursively produce a copy of this subtree with `node_id` marked
    /// explored. Unchanged branches are returned by cloning their `Arc`
    /// (no new allocation), only the path down to the target node is
    /// rebuilt.
    fn with_marked_explored(self: &Arc<Self>, node_id: &str) -> Arc<Self> {
        if self.id == node_id {
            let mut node = (**self).clone();
            node.explored = true;
            return Arc::new(node);
        }

        let mut changed = false;
        let prerequisites: Vec<Arc<KnowledgeNode>> = self
            .prerequisites
            .iter()
            .map(|child| {
                let updated = child.with_marked_explored(node_id);
                if !Arc::ptr_eq(&updated, child) {
                    changed = true;
                }
                updated
            })
            .collect();

        if !changed {
            return Arc::clone(self);
        }

        Arc::new((**self).clone().with_prerequisites(prerequisites))
    }

    fn count(&self) -> usize {
        1 + self.prerequisites.iter().map(|p| p.count()).sum::<usize>()
    }

    fn max_depth(&self) -> u32 {
        self.prerequisites
            .iter()
            .map(|p| p.max_depth())
            .max()
            .unwrap_or(self.depth)
            .max(self.depth)
    }

    fn post_order(&self, out: &mut Vec<String>) {
        for child in &self.prerequisites {
            child.post_order(out);
        }
        out.push(self.id.clone());
    }
}

/// The bounded-depth prerequisite tree produced by the prerequisite
/// explorer. Every mutation returns a new `KnowledgeTree`; subtrees
/// untouched by the mutation are shared, not copied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeTree {
    pub root: Arc<KnowledgeNode>,
    pub total_nodes: usize,
    pub max_depth: u32,
    pub learning_path: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl KnowledgeTree {
    pub fn new(root: Arc<KnowledgeNode>) -> Self {
        let mut learning_path = Vec::new();
        root.post_order(&mut learning_path);
        Self {
            total_nodes: root.count(),
            max_depth: root.max_depth(),
            learning_path,
            root,
            metadata: HashMap::new(),
        }
    }

    /// Return a new tree with `node_id` marked explored, sharing every
    /// subtree not on the path to that node.
    pub fn mark_explored(&self, node_id: &str) -> Self {
        Self::new(self.root.with_marked_explored(node_id))
    }

    /// Whether any two nodes share a case-insensitive concept name.
    pub fn has_duplicate_concepts(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![Arc::clone(&self.root)];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.concept.to_lowercase()) {
                return true;
            }
            stack.extend(node.prerequisites.iter().cloned());
        }
        false
    }
}

/// A labeled equation surfaced by the math enricher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equation {
    pub id: String,
    pub expression: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// A named theorem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theorem {
    pub id: String,
    pub name: String,
    pub statement: String,
}

/// A term/description pair, deduplicated by lowercased term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub term: String,
    pub description: String,
}

/// A suggested visualization, combining keyword templates and provider
/// suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationSuggestion {
    pub name: String,
    pub description: String,
}

/// Mathematical content accumulated by the math enricher, capped per
/// field and deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathEnrichment {
    pub equations: Vec<Equation>,
    pub theorems: Vec<Theorem>,
    pub definitions: Vec<Definition>,
    pub visualizations: Vec<VisualizationSuggestion>,
    pub color_coding: HashMap<String, String>,
    pub animation_sequence: Vec<String>,
}

impl MathEnrichment {
    pub const MAX_EQUATIONS: usize = 10;
    pub const MAX_THEOREMS: usize = 3;
    pub const MAX_DEFINITIONS: usize = 5;
    pub const MAX_VISUALIZATIONS: usize = 5;

    pub fn empty() -> Self {
        Self {
            equations: Vec::new(),
            theorems: Vec::new(),
            definitions: Vec::new(),
            visualizations: Vec::new(),
            color_coding: HashMap::new(),
            animation_sequence: Vec::new(),
        }
    }
}

/// Named palette plus an open-ended custom color map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    pub highlight: String,
    pub custom: HashMap<String, String>,
}

/// Typography settings for the rendered scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Typography {
    pub title_font: String,
    pub body_font: String,
    pub base_size: f64,
    pub scale_ratio: f64,
}

/// Camera/view state at a specific time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub zoom: f64,
    pub rotation: f64,
    pub phi: Option<f64>,
    pub theta: Option<f64>,
    pub easing: Easing,
    pub duration: f64,
}

/// Interpolation curve between keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

/// A narrative/visual unit of the composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatType {
    Intro,
    Setup,
    Explanation,
    Reveal,
    Demonstration,
    Climax,
    Resolution,
    Transition,
    Conclusion,
    Pause,
}

/// Emotional register of a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Curious,
    Calm,
    Contemplative,
    Excited,
    Triumphant,
    Neutral,
}

/// A timed narrative/visual unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beat {
    pub id: String,
    pub time: f64,
    pub duration: f64,
    pub beat_type: BeatType,
    pub tone: Tone,
    pub animations: Vec<String>,
    pub content_ids: Vec<String>,
    pub camera_keyframe: Option<Keyframe>,
}

/// The complete visual plan for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualDesign {
    pub color_palette: ColorPalette,
    pub typography: Typography,
    pub timing_beats: Vec<Beat>,
    pub camera_keyframes: Vec<Keyframe>,
    pub transitions: Vec<String>,
    pub is_3d: bool,
    pub total_duration: f64,
}

impl VisualDesign {
    /// Whether beats are contiguous and non-overlapping, per the timing
    /// invariant: `beat.time[i+1] == beat.time[i] + beat.duration[i]`.
    pub fn beats_are_contiguous(&self) -> bool {
        self.timing_beats.windows(2).all(|pair| {
            (pair[0].time + pair[0].duration - pair[1].time).abs() < 1e-6
        })
    }
}

/// A segment of narration within a story arc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub narration: String,
    pub key_points: Vec<String>,
    pub visual_cues: Vec<String>,
    pub duration: f64,
    pub tone: Tone,
    pub rhetorical_question: Option<String>,
}

/// The narrative arc: hook, rising action, climax, resolution, takeaway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryArc {
    pub hook: String,
    pub rising_action: Vec<Segment>,
    pub climax: String,
    pub resolution: Vec<Segment>,
    pub takeaway: String,
}

/// The complete narrative composed for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub arcs: Vec<StoryArc>,
    pub total_duration: f64,
    pub learning_objectives: Vec<String>,
    pub verbose_prompt: String,
    pub word_count: usize,
}

/// Live status of an interactive session, broadcast after every accepted
/// command and on client connect/disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub playing: bool,
    pub current_time: f64,
    pub total_duration: f64,
    pub speed: f64,
    pub connected: usize,
}
