//! Child-process command construction, spawn, and output discovery shared
//! by both renderer variants.

use crate::job::Quality;
use crate::renderer::select::RendererKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Bounded ring buffer for streamed stdout/stderr lines: keeps the
/// process output readable without retaining an unbounded log.
const MAX_BUFFERED_LINES: usize = 500;

/// Stderr embedded in an error message is truncated to this many bytes so
/// a runaway renderer can't balloon an error payload.
const MAX_STDERR_BYTES: usize = 2048;

/// Join `lines` and truncate to `MAX_STDERR_BYTES`, appending a marker if
/// anything was cut.
fn truncated_stderr(lines: &[String]) -> String {
    let joined = lines.join("\n");
    if joined.len() <= MAX_STDERR_BYTES {
        joined
    } else {
        let mut cut = MAX_STDERR_BYTES;
        while !joined.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &joined[..cut])
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub job_id: String,
    pub code: String,
    pub quality: Quality,
    pub temp_dir: PathBuf,
    pub media_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub video_path: PathBuf,
    pub stdout_tail: Vec<String>,
    pub render_time: Duration,
}

/// Build `{command, args}` for invoking the renderer on `scene_path`.
/// The source this pipeline is modeled on conflated `--skip_animations`
/// with `--write_file`; they are mutually exclusive and this builder
/// never emits both.
pub fn build_command(kind: RendererKind, scene_path: &Path, quality: Quality) -> (String, Vec<String>) {
    let mut args = vec![scene_path.display().to_string(), "MainScene".to_string()];
    args.push(quality_flag(kind, quality).to_string());
    args.push("--write_file".to_string());

    let command = match kind {
        RendererKind::Standard => "manim".to_string(),
        RendererKind::GL => "manimgl".to_string(),
    };
    (command, args)
}

pub fn quality_flag(kind: RendererKind, quality: Quality) -> &'static str {
    match (kind, quality) {
        (RendererKind::Standard, Quality::Low) => "-ql",
        (RendererKind::Standard, Quality::Medium) => "-qm",
        (RendererKind::Standard, Quality::High) => "-qh",
        (RendererKind::GL, Quality::Low) => "-l",
        (RendererKind::GL, Quality::Medium) => "-m",
        (RendererKind::GL, Quality::High) => "-hr",
    }
}

/// Write transformed code to `{tempDir}/{jobId}/scene.py`, spawn the
/// renderer, stream its output, and locate the resulting video file.
pub async fn render(
    kind: RendererKind,
    options: &RenderOptions,
    transformed_code: &str,
) -> crate::Result<RenderResult> {
    let job_dir = options.temp_dir.join(&options.job_id);
    tokio::fs::create_dir_all(&job_dir)
        .await
        .map_err(|e| crate::OrchestratorError::Renderer(format!("failed to create temp dir: {e}")))?;

    let scene_path = job_dir.join("scene.py");
    tokio::fs::write(&scene_path, transformed_code)
        .await
        .map_err(|e| crate::OrchestratorError::Renderer(format!("failed to write scene file: {e}")))?;

    let (command, args) = build_command(kind, &scene_path, options.quality);
    let started = Instant::now();

    let mut child = Command::new(&command)
        .args(&args)
        .current_dir(&options.media_dir)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| crate::OrchestratorError::Renderer(format!("failed to spawn {command}: {e}")))?;

    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let stdout_task = tokio::spawn(collect_lines(stdout, "stdout"));
    let stderr_task = tokio::spawn(collect_lines(stderr, "stderr"));

    let status = child
        .wait()
        .await
        .map_err(|e| crate::OrchestratorError::Renderer(format!("renderer process error: {e}")))?;

    let stdout_lines = stdout_task.await.unwrap_or_default();
    let stderr_lines = stderr_task.await.unwrap_or_default();
    let render_time = started.elapsed();

    if !status.success() {
        return Err(crate::OrchestratorError::Renderer(format!(
            "renderer exited with {status}: {}",
            truncated_stderr(&stderr_lines)
        )));
    }

    match find_video_file(&options.media_dir, options.quality) {
        Some(video_path) => Ok(RenderResult {
            video_path,
            stdout_tail: stdout_lines,
            render_time,
        }),
        None => Err(crate::OrchestratorError::Renderer(format!(
            "renderer exited successfully but no output file was found; stderr: {}",
            truncated_stderr(&stderr_lines)
        ))),
    }
}

async fn collect_lines<R: tokio::io::AsyncRead + Unpin>(reader: R, stream_name: &str) -> Vec<String> {
    let mut lines = BufReader::new(reader).lines();
    let mut buffer = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(stream = stream_name, "{}", line);
        if buffer.len() >= MAX_BUFFERED_LINES {
            buffer.remove(0);
        }
        buffer.push(line);
    }
    buffer
}

/// Search `{mediaDir}/videos/scene/{qualityFolder}/MainScene.mp4` first,
/// then fall back to a recursive search for `MainScene.mp4` / `.mov`.
pub fn find_video_file(media_dir: &Path, quality: Quality) -> Option<PathBuf> {
    let direct = media_dir
        .join("videos")
        .join("scene")
        .join(quality.folder())
        .join("MainScene.mp4");
    if direct.is_file() {
        return Some(direct);
    }
    search_recursive(media_dir, &["MainScene.mp4", "MainScene.mov"])
}

fn search_recursive(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if names.contains(&file_name) {
                return Some(path);
            }
        }
    }
    for subdir in subdirs {
        if let Some(found) = search_recursive(&subdir, names) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_never_combines_skip_animations_with_write_file() {
        let (_, args) = build_command(RendererKind::Standard, Path::new("/tmp/scene.py"), Quality::Medium);
        let has_skip = args.iter().any(|a| a == "--skip_animations");
        let has_write = args.iter().any(|a| a == "--write_file");
        assert!(!(has_skip && has_write));
        assert!(has_write);
    }

    #[test]
    fn stderr_longer_than_the_limit_is_truncated() {
        let lines: Vec<String> = (0..400).map(|i| format!("line {i} of noisy renderer output")).collect();
        let joined = truncated_stderr(&lines);
        assert!(joined.len() <= MAX_STDERR_BYTES + "... (truncated)".len());
        assert!(joined.ends_with("... (truncated)"));
    }

    #[test]
    fn stderr_under_the_limit_is_untouched() {
        let lines = vec!["short error".to_string()];
        assert_eq!(truncated_stderr(&lines), "short error");
    }

    #[test]
    fn quality_flags_differ_by_renderer_kind() {
        assert_eq!(quality_flag(RendererKind::Standard, Quality::High), "-qh");
        assert_eq!(quality_flag(RendererKind::GL, Quality::High), "-hr");
    }

    #[test]
    fn find_video_file_prefers_direct_path() {
        let tmp = std::env::temp_dir().join(format!("orch-render-test-{}", std::process::id()));
        let direct_dir = tmp.join("videos").join("scene").join(Quality::Low.folder());
        std::fs::create_dir_all(&direct_dir).unwrap();
        std::fs::write(direct_dir.join("MainScene.mp4"), b"fake").unwrap();

        let found = find_video_file(&tmp, Quality::Low).unwrap();
        assert_eq!(found, direct_dir.join("MainScene.mp4"));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn find_video_file_falls_back_to_recursive_search() {
        let tmp = std::env::temp_dir().join(format!("orch-render-test-rec-{}", std::process::id()));
        let nested = tmp.join("some").join("nested").join("path");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("MainScene.mov"), b"fake").unwrap();

        let found = find_video_file(&tmp, Quality::High).unwrap();
        assert_eq!(found, nested.join("MainScene.mov"));

        std::fs::remove_dir_all(&tmp).ok();
    }
}
