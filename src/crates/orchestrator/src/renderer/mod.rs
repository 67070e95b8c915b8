//! Renderer dispatch: environment probing, criteria-based selection
//! between the Standard and GL dialects, code transform, and child
//! process supervision.

pub mod dispatch;
pub mod probe;
pub mod process;
pub mod select;
pub mod transform;

pub use dispatch::RenderDispatcher;
pub use probe::EnvironmentProbe;
pub use process::{RenderOptions, RenderResult};
pub use select::{select_renderer, RendererKind, SelectionCriteria, SelectionResult};

use async_trait::async_trait;
use std::path::PathBuf;

/// Behaviour shared by both renderer variants, named after the
/// operations spec §4.4 enumerates for each.
#[async_trait]
pub trait Renderer: Send + Sync {
    fn kind(&self) -> RendererKind;
    fn is_available(&self, probe: &EnvironmentProbe) -> bool;
    fn get_version(&self) -> Option<String>;
    fn transform_code(&self, code: &str) -> String {
        transform::transform_code(code, self.kind())
    }
    fn get_quality_flag(&self, quality: crate::job::Quality) -> &'static str {
        process::quality_flag(self.kind(), quality)
    }
    fn get_command(&self, scene_path: &std::path::Path, quality: crate::job::Quality) -> (String, Vec<String>) {
        process::build_command(self.kind(), scene_path, quality)
    }
    fn find_video_file(&self, media_dir: &std::path::Path, quality: crate::job::Quality) -> Option<PathBuf> {
        process::find_video_file(media_dir, quality)
    }
    async fn render(&self, options: &RenderOptions) -> crate::Result<RenderResult> {
        let code = self.transform_code(&options.code);
        process::render(self.kind(), options, &code).await
    }
}

pub struct StandardRenderer;

#[async_trait]
impl Renderer for StandardRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Standard
    }

    fn is_available(&self, probe: &EnvironmentProbe) -> bool {
        probe.has_standard
    }

    fn get_version(&self) -> Option<String> {
        version_of("manim")
    }
}

pub struct GLRenderer;

#[async_trait]
impl Renderer for GLRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::GL
    }

    fn is_available(&self, probe: &EnvironmentProbe) -> bool {
        probe.has_gl
    }

    fn get_version(&self) -> Option<String> {
        version_of("manimgl")
    }
}

fn version_of(binary: &str) -> Option<String> {
    let output = std::process::Command::new(binary).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Resolve a [`Renderer`] for `kind`.
pub fn renderer_for(kind: RendererKind) -> Box<dyn Renderer> {
    match kind {
        RendererKind::Standard => Box::new(StandardRenderer),
        RendererKind::GL => Box::new(GLRenderer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trait_methods_delegate_to_free_functions() {
        let renderer = renderer_for(RendererKind::Standard);
        assert_eq!(renderer.get_quality_flag(crate::job::Quality::Low), "-ql");
        let transformed = renderer.transform_code("from manimlib import *\n");
        assert!(transformed.contains("from manim import *"));
    }

    #[test]
    fn gl_renderer_reports_its_kind() {
        let renderer = renderer_for(RendererKind::GL);
        assert_eq!(renderer.kind(), RendererKind::GL);
    }
}
