//! Third pipeline stage: accumulate equations, theorems, definitions and
//! visualization suggestions for every concept in the prerequisite tree.
//!
//! Provider output is a best-effort addition on top of a keyword-driven
//! baseline; a provider failure leaves the baseline enrichment intact
//! rather than failing the job.

use crate::domain::{Definition, Equation, MathEnrichment, Theorem, VisualizationSuggestion};
use crate::events::{Event, Handler, Payload, Topic};
use crate::job::Quality;
use crate::providers::{FallbackChain, Router, Task};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

const VISUALIZATION_KEYWORDS: &[(&str, &str, &str)] = &[
    ("graph", "Function Graph", "plot the function on a coordinate grid"),
    ("circle", "Unit Circle", "trace the relationship around a unit circle"),
    ("triangle", "Triangle Construction", "build up the triangle side by side"),
    ("vector", "Vector Field", "show vectors as arrows over a grid"),
    ("matrix", "Linear Transformation", "animate the grid under the transformation"),
    ("limit", "Limit Approach", "zoom in on the point as the variable approaches the limit"),
    ("derivative", "Tangent Line", "sweep a tangent line along the curve"),
    ("integral", "Area Under Curve", "fill the region under the curve with rectangles"),
];

const COLOR_ROLES: &[(&str, &str)] = &[
    ("variable", "#3B82F6"),
    ("constant", "#F59E0B"),
    ("result", "#10B981"),
    ("error", "#EF4444"),
];

/// A fixed reference entry, matched against a concept by case-insensitive
/// substring over its `keywords` (standing in for tags/name/statement).
struct StaticEntry {
    keywords: &'static [&'static str],
    equation_id: &'static str,
    equation_expr: &'static str,
    equation_desc: &'static str,
    theorem_id: &'static str,
    theorem_name: &'static str,
    theorem_statement: &'static str,
    definition_term: &'static str,
    definition_desc: &'static str,
}

const STATIC_LIBRARY: &[StaticEntry] = &[
    StaticEntry {
        keywords: &["derivative", "slope", "tangent"],
        equation_id: "lib-derivative",
        equation_expr: "d/dx f(x) = lim(h->0) (f(x+h) - f(x)) / h",
        equation_desc: "Definition of the derivative as a limit of difference quotients.",
        theorem_id: "lib-theorem-power-rule",
        theorem_name: "Power Rule",
        theorem_statement: "d/dx x^n = n * x^(n-1) for any real n.",
        definition_term: "derivative",
        definition_desc: "The instantaneous rate of change of a function.",
    },
    StaticEntry {
        keywords: &["integral", "area under", "antiderivative"],
        equation_id: "lib-integral",
        equation_expr: "integral from a to b of f(x) dx = F(b) - F(a)",
        equation_desc: "The fundamental theorem of calculus, relating integrals and antiderivatives.",
        theorem_id: "lib-theorem-ftc",
        theorem_name: "Fundamental Theorem of Calculus",
        theorem_statement: "If F is an antiderivative of f, the definite integral equals F(b) - F(a).",
        definition_term: "integral",
        definition_desc: "The signed area between a function's graph and the x-axis.",
    },
    StaticEntry {
        keywords: &["limit", "approaches", "converge"],
        equation_id: "lib-limit",
        equation_expr: "lim(x->a) f(x) = L",
        equation_desc: "f(x) gets arbitrarily close to L as x approaches a.",
        theorem_id: "lib-theorem-squeeze",
        theorem_name: "Squeeze Theorem",
        theorem_statement: "If g(x) <= f(x) <= h(x) near a and g, h both converge to L, then f converges to L.",
        definition_term: "limit",
        definition_desc: "The value a function approaches as its input approaches some point.",
    },
    StaticEntry {
        keywords: &["vector", "magnitude", "direction"],
        equation_id: "lib-vector",
        equation_expr: "|v| = sqrt(v1^2 + v2^2 + ... + vn^2)",
        equation_desc: "The magnitude of a vector as the square root of the sum of squared components.",
        theorem_id: "lib-theorem-triangle-inequality",
        theorem_name: "Triangle Inequality",
        theorem_statement: "|u + v| <= |u| + |v| for any vectors u and v.",
        definition_term: "vector",
        definition_desc: "A quantity with both magnitude and direction.",
    },
    StaticEntry {
        keywords: &["matrix", "linear transformation", "eigen"],
        equation_id: "lib-matrix",
        equation_expr: "Av = lambda * v",
        equation_desc: "An eigenvector v of A scaled by its eigenvalue lambda.",
        theorem_id: "lib-theorem-rank-nullity",
        theorem_name: "Rank-Nullity Theorem",
        theorem_statement: "rank(A) + nullity(A) = number of columns of A.",
        definition_term: "matrix",
        definition_desc: "A rectangular array of numbers representing a linear map.",
    },
    StaticEntry {
        keywords: &["probability", "random", "distribution"],
        equation_id: "lib-probability",
        equation_expr: "P(A) = |A| / |S|",
        equation_desc: "The probability of an event as the ratio of favorable to total outcomes.",
        theorem_id: "lib-theorem-bayes",
        theorem_name: "Bayes' Theorem",
        theorem_statement: "P(A|B) = P(B|A) * P(A) / P(B).",
        definition_term: "probability",
        definition_desc: "A measure of how likely an event is to occur.",
    },
];

pub struct MathEnricher {
    event_bus: Arc<crate::events::EventBus>,
    router: Arc<Router>,
    chain: Arc<FallbackChain>,
}

impl MathEnricher {
    pub fn new(event_bus: Arc<crate::events::EventBus>, router: Arc<Router>, chain: Arc<FallbackChain>) -> Self {
        Self { event_bus, router, chain }
    }

    /// Baseline enrichment derived from the concept and prerequisite
    /// names, supplemented by the static reference library, capped to
    /// the documented per-field limits.
    fn baseline(concepts: &[String]) -> MathEnrichment {
        let mut enrichment = MathEnrichment::empty();

        for (i, concept) in concepts.iter().enumerate() {
            if enrichment.equations.len() < MathEnrichment::MAX_EQUATIONS {
                enrichment.equations.push(Equation {
                    id: format!("eq-{i}"),
                    expression: concept.clone(),
                    description: format!("Core relation for {concept}"),
                    tags: vec!["auto-generated".into()],
                });
            }

            let lower = concept.to_lowercase();
            for (keyword, name, description) in VISUALIZATION_KEYWORDS {
                if lower.contains(keyword) && enrichment.visualizations.len() < MathEnrichment::MAX_VISUALIZATIONS {
                    enrichment.visualizations.push(VisualizationSuggestion {
                        name: name.to_string(),
                        description: description.to_string(),
                    });
                }
            }

            for entry in STATIC_LIBRARY.iter().filter(|e| e.keywords.iter().any(|k| lower.contains(k))) {
                if enrichment.equations.len() < MathEnrichment::MAX_EQUATIONS {
                    enrichment.equations.push(Equation {
                        id: entry.equation_id.into(),
                        expression: entry.equation_expr.into(),
                        description: entry.equation_desc.into(),
                        tags: entry.keywords.iter().map(|k| k.to_string()).collect(),
                    });
                }
                if enrichment.theorems.len() < MathEnrichment::MAX_THEOREMS {
                    enrichment.theorems.push(Theorem {
                        id: entry.theorem_id.into(),
                        name: entry.theorem_name.into(),
                        statement: entry.theorem_statement.into(),
                    });
                }
                if enrichment.definitions.len() < MathEnrichment::MAX_DEFINITIONS {
                    enrichment.definitions.push(Definition {
                        term: entry.definition_term.into(),
                        description: entry.definition_desc.into(),
                    });
                }
            }
        }

        if enrichment.theorems.len() < MathEnrichment::MAX_THEOREMS {
            if let Some(first) = concepts.first() {
                enrichment.theorems.push(Theorem {
                    id: "theorem-0".into(),
                    name: format!("{first} theorem"),
                    statement: format!("A foundational result underlying {first}."),
                });
            }
        }

        for concept in concepts.iter().take(MathEnrichment::MAX_DEFINITIONS) {
            if enrichment.definitions.len() >= MathEnrichment::MAX_DEFINITIONS {
                break;
            }
            enrichment.definitions.push(Definition {
                term: concept.clone(),
                description: format!("{concept} as used in this explanation."),
            });
        }

        for (role, color) in COLOR_ROLES {
            enrichment.color_coding.insert((*role).to_string(), (*color).to_string());
        }

        enrichment.animation_sequence = concepts.iter().map(|c| format!("introduce:{c}")).collect();
        Self::dedup(&mut enrichment);
        enrichment
    }

    /// Equations dedup by id, theorems by id, definitions by lowercased
    /// term, preserving first-seen order.
    fn dedup(enrichment: &mut MathEnrichment) {
        let mut seen = HashSet::new();
        enrichment.equations.retain(|e| seen.insert(e.id.clone()));
        let mut seen = HashSet::new();
        enrichment.theorems.retain(|t| seen.insert(t.id.clone()));
        let mut seen = HashSet::new();
        enrichment.definitions.retain(|d| seen.insert(d.term.to_lowercase()));
    }

    /// Classify one line of freeform provider output: a line naming a
    /// theorem becomes a `Theorem`, a line containing an `=` sign
    /// becomes an `Equation`, everything else becomes a `Definition`.
    fn apply_provider_line(enrichment: &mut MathEnrichment, index: usize, line: &str) {
        let lower = line.to_lowercase();
        if lower.contains("theorem") && enrichment.theorems.len() < MathEnrichment::MAX_THEOREMS {
            enrichment.theorems.push(Theorem {
                id: format!("ai-theorem-{index}"),
                name: format!("AI-suggested theorem {index}"),
                statement: line.to_string(),
            });
        } else if line.contains('=') && enrichment.equations.len() < MathEnrichment::MAX_EQUATIONS {
            enrichment.equations.push(Equation {
                id: format!("ai-eq-{index}"),
                expression: line.to_string(),
                description: format!("AI-suggested relation {index}"),
                tags: vec!["ai-generated".into()],
            });
        } else if enrichment.definitions.len() < MathEnrichment::MAX_DEFINITIONS {
            enrichment.definitions.push(Definition {
                term: format!("ai-note-{index}"),
                description: line.to_string(),
            });
        }
    }

    /// Flatten the tree's learning path, keeping concept text rather than
    /// node ids. Falls back to the root concept alone on an empty tree.
    fn concepts_from_tree(tree: &crate::domain::KnowledgeTree) -> Vec<String> {
        let mut concepts = Vec::new();
        let mut stack = vec![Arc::clone(&tree.root)];
        while let Some(node) = stack.pop() {
            concepts.push(node.concept.clone());
            stack.extend(node.prerequisites.iter().cloned());
        }
        if concepts.is_empty() {
            concepts.push(tree.root.concept.clone());
        }
        concepts
    }
}

#[async_trait]
impl Handler for MathEnricher {
    async fn handle(&self, event: Event) {
        let Payload::PrerequisitesResolved { context, tree } = &*event.payload else { return };
        let context = context.clone();
        let tree = tree.clone();

        let concepts = Self::concepts_from_tree(&tree);
        let mut enrichment = Self::baseline(&concepts);

        if context.quality != Quality::Low {
            let order = self.router.preference_order(Task::MathEnrichment);
            let concept = context.concept.clone();
            let result = self
                .chain
                .execute_for_task("math_enrichment", &order, |provider| {
                    let concept = concept.clone();
                    async move { provider.enrich_math(&concept).await }
                })
                .await;

            match result {
                Ok(text) => {
                    for (i, line) in text.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
                        Self::apply_provider_line(&mut enrichment, i, line);
                    }
                    Self::dedup(&mut enrichment);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "math enrichment provider federation failed, keeping baseline enrichment");
                }
            }
        }

        self.event_bus
            .publish(Event::new(
                Topic::MathEnriched,
                event.job_id.clone(),
                Payload::MathEnriched { context, tree, enrichment },
            ))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KnowledgeNode;

    #[test]
    fn baseline_caps_equations_at_the_documented_limit() {
        let concepts: Vec<String> = (0..20).map(|i| format!("concept-{i}")).collect();
        let enrichment = MathEnricher::baseline(&concepts);
        assert_eq!(enrichment.equations.len(), MathEnrichment::MAX_EQUATIONS);
    }

    #[test]
    fn baseline_detects_visualization_keywords() {
        let concepts = vec!["graph of a function".to_string(), "unrelated topic".to_string()];
        let enrichment = MathEnricher::baseline(&concepts);
        assert!(enrichment.visualizations.iter().any(|v| v.name == "Function Graph"));
    }

    #[test]
    fn concepts_from_tree_includes_prerequisites() {
        let child = Arc::new(KnowledgeNode::new("c", "limits", "desc", 0.5, 10, 1));
        let root = Arc::new(KnowledgeNode::new("r", "derivatives", "desc", 0.8, 20, 0).with_prerequisites(vec![child]));
        let tree = crate::domain::KnowledgeTree::new(root);

        let concepts = MathEnricher::concepts_from_tree(&tree);
        assert!(concepts.contains(&"limits".to_string()));
        assert!(concepts.contains(&"derivatives".to_string()));
    }

    #[test]
    fn baseline_pulls_in_the_static_library_for_a_known_concept() {
        let enrichment = MathEnricher::baseline(&["the derivative of a function".to_string()]);
        assert!(enrichment.equations.iter().any(|e| e.id == "lib-derivative"));
        assert!(enrichment.theorems.iter().any(|t| t.id == "lib-theorem-power-rule"));
        assert!(enrichment.definitions.iter().any(|d| d.term == "derivative"));
    }

    #[test]
    fn dedup_removes_duplicate_equations_theorems_and_definitions() {
        let mut enrichment = MathEnrichment::empty();
        enrichment.equations.push(Equation { id: "e1".into(), expression: "a".into(), description: "d".into(), tags: vec![] });
        enrichment.equations.push(Equation { id: "e1".into(), expression: "b".into(), description: "d".into(), tags: vec![] });
        enrichment.definitions.push(Definition { term: "Limit".into(), description: "d".into() });
        enrichment.definitions.push(Definition { term: "limit".into(), description: "d2".into() });

        MathEnricher::dedup(&mut enrichment);
        assert_eq!(enrichment.equations.len(), 1);
        assert_eq!(enrichment.definitions.len(), 1);
    }

    #[test]
    fn apply_provider_line_classifies_theorem_equation_and_definition() {
        let mut enrichment = MathEnrichment::empty();
        MathEnricher::apply_provider_line(&mut enrichment, 0, "Pythagorean theorem relates the sides");
        MathEnricher::apply_provider_line(&mut enrichment, 1, "a^2 + b^2 = c^2");
        MathEnricher::apply_provider_line(&mut enrichment, 2, "a right triangle has one 90 degree angle");

        assert_eq!(enrichment.theorems.len(), 1);
        assert_eq!(enrichment.equations.len(), 1);
        assert_eq!(enrichment.definitions.len(), 1);
    }
}
