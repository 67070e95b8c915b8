//! Renderer selection: a criteria bundle walked through ten ordered
//! decision rules, first match wins.

use super::probe::EnvironmentProbe;
use serde::{Deserialize, Serialize};

/// Which renderer variant was selected (or would be used).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Standard,
    GL,
}

/// Criteria the caller wants satisfied by the chosen renderer.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    pub interactive: bool,
    pub gpu_shaders: bool,
    pub real_time_preview: bool,
    pub docker_required: bool,
    pub prefer_gpu: bool,
    pub preferred_renderer: Option<RendererKind>,
    pub required_features: Vec<String>,
}

/// Outcome of a selection attempt, with a human-readable explanation.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub renderer: RendererKind,
    pub reason: String,
    pub warnings: Vec<String>,
    pub unavailable_features: Vec<String>,
}

/// Features only one renderer variant supports, used for rule 6.
fn gl_only_features() -> &'static [&'static str] {
    &["gpu_shaders", "real_time_preview", "interactive"]
}

fn standard_only_features() -> &'static [&'static str] {
    &["docker_safe"]
}

/// Walk the ten ordered rules against `criteria` and the cached
/// environment probe, returning the first match.
pub fn select_renderer(
    criteria: &SelectionCriteria,
    probe: &EnvironmentProbe,
) -> crate::Result<SelectionResult> {
    let mut warnings = Vec::new();

    // Rule 1: explicit preference, if available.
    if let Some(preferred) = criteria.preferred_renderer {
        if renderer_available(preferred, probe) {
            return Ok(SelectionResult {
                renderer: preferred,
                reason: format!("explicit preference for {preferred:?}"),
                warnings,
                unavailable_features: Vec::new(),
            });
        }
        warnings.push(format!("preferred renderer {preferred:?} unavailable, falling back"));
    }

    // Rule 2: interactive needs GL + display.
    if criteria.interactive && probe.has_gl && probe.has_display {
        return Ok(result(RendererKind::GL, "interactive session requires GL renderer", warnings));
    }

    // Rule 3: GPU shaders need GL + GPU.
    if criteria.gpu_shaders && probe.has_gl && probe.has_gpu {
        return Ok(result(RendererKind::GL, "GPU shaders require GL renderer", warnings));
    }

    // Rule 4: real-time preview needs GL + display.
    if criteria.real_time_preview && probe.has_gl && probe.has_display {
        return Ok(result(RendererKind::GL, "real-time preview requires GL renderer", warnings));
    }

    // Rule 5: Docker (explicit or detected) forces Standard.
    if (criteria.docker_required || probe.is_docker) && probe.has_standard {
        return Ok(result(RendererKind::Standard, "Docker environment requires Standard renderer", warnings));
    }

    // Rule 6: required features satisfied only by one variant.
    let gl_only = gl_only_features();
    let standard_only = standard_only_features();
    let needs_gl_only = criteria.required_features.iter().any(|f| gl_only.contains(&f.as_str()));
    let needs_standard_only = criteria.required_features.iter().any(|f| standard_only.contains(&f.as_str()));
    if needs_gl_only && !needs_standard_only && probe.has_gl {
        return Ok(result(RendererKind::GL, "required features are GL-only", warnings));
    }
    if needs_standard_only && !needs_gl_only && probe.has_standard {
        return Ok(result(RendererKind::Standard, "required features are Standard-only", warnings));
    }

    // Rule 7: prefer GPU when available and GL present.
    if criteria.prefer_gpu && probe.has_gpu && probe.has_gl {
        return Ok(result(RendererKind::GL, "GPU preferred and available", warnings));
    }

    // Rule 8: default to Standard.
    if probe.has_standard {
        return Ok(result(RendererKind::Standard, "default renderer", warnings));
    }

    // Rule 9: fall back to GL.
    if probe.has_gl {
        warnings.push("Standard renderer unavailable, falling back to GL".to_string());
        return Ok(result(RendererKind::GL, "fallback: only GL available", warnings));
    }

    // Rule 10: nothing available.
    Err(crate::OrchestratorError::Environment(
        "no renderer available in this environment".to_string(),
    ))
}

fn renderer_available(kind: RendererKind, probe: &EnvironmentProbe) -> bool {
    match kind {
        RendererKind::Standard => probe.has_standard,
        RendererKind::GL => probe.has_gl,
    }
}

fn result(renderer: RendererKind, reason: &str, warnings: Vec<String>) -> SelectionResult {
    SelectionResult {
        renderer,
        reason: reason.to_string(),
        warnings,
        unavailable_features: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(has_standard: bool, has_gl: bool, has_display: bool, has_gpu: bool, is_docker: bool) -> EnvironmentProbe {
        EnvironmentProbe {
            is_docker,
            has_gpu,
            has_display,
            has_standard,
            has_gl,
        }
    }

    #[test]
    fn interactive_picks_gl_when_available() {
        let p = probe(true, true, true, false, false);
        let result = select_renderer(
            &SelectionCriteria { interactive: true, ..Default::default() },
            &p,
        )
        .unwrap();
        assert_eq!(result.renderer, RendererKind::GL);
    }

    #[test]
    fn docker_forces_standard_even_with_gl_available() {
        let p = probe(true, true, true, true, true);
        let result = select_renderer(&SelectionCriteria::default(), &p).unwrap();
        assert_eq!(result.renderer, RendererKind::Standard);
    }

    #[test]
    fn default_is_standard_when_available() {
        let p = probe(true, true, true, false, false);
        let result = select_renderer(&SelectionCriteria::default(), &p).unwrap();
        assert_eq!(result.renderer, RendererKind::Standard);
    }

    #[test]
    fn falls_back_to_gl_when_standard_unavailable() {
        let p = probe(false, true, true, false, false);
        let result = select_renderer(&SelectionCriteria::default(), &p).unwrap();
        assert_eq!(result.renderer, RendererKind::GL);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn no_renderer_available_fails() {
        let p = probe(false, false, false, false, false);
        assert!(select_renderer(&SelectionCriteria::default(), &p).is_err());
    }

    #[test]
    fn explicit_preference_wins_when_available() {
        let p = probe(true, true, true, false, false);
        let result = select_renderer(
            &SelectionCriteria {
                preferred_renderer: Some(RendererKind::GL),
                ..Default::default()
            },
            &p,
        )
        .unwrap();
        assert_eq!(result.renderer, RendererKind::GL);
    }
}
