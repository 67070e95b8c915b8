//! Environment probing: Docker, GPU, and display detection. Results are
//! cached on first call since none of these change for the life of the
//! process.

use std::sync::OnceLock;

/// Cached results of probing the runtime environment for renderer
/// capabilities.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentProbe {
    pub is_docker: bool,
    pub has_gpu: bool,
    pub has_display: bool,
    pub has_standard: bool,
    pub has_gl: bool,
}

static PROBE: OnceLock<EnvironmentProbe> = OnceLock::new();

impl EnvironmentProbe {
    /// Probe the environment once and cache the result for the life of
    /// the process.
    pub fn get() -> Self {
        *PROBE.get_or_init(Self::detect)
    }

    fn detect() -> Self {
        let is_docker = detect_docker();
        let has_display = detect_display();
        Self {
            is_docker,
            has_gpu: detect_gpu(),
            has_display,
            has_standard: detect_standard_available(),
            has_gl: detect_gl_available(has_display),
        }
    }
}

fn detect_docker() -> bool {
    if std::path::Path::new("/.dockerenv").exists() {
        return true;
    }
    std::fs::read_to_string("/proc/1/cgroup")
        .map(|contents| contents.contains("docker") || contents.contains("kubepods"))
        .unwrap_or(false)
}

fn detect_gpu() -> bool {
    if cfg!(target_os = "macos") {
        return true;
    }
    which_binary("nvidia-smi") || which_binary("rocm-smi")
}

fn detect_display() -> bool {
    if cfg!(target_os = "macos") {
        return true;
    }
    if cfg!(target_os = "windows") {
        return std::env::var("SESSIONNAME").is_ok();
    }
    std::env::var("DISPLAY").map(|v| !v.is_empty()).unwrap_or(false)
}

fn detect_standard_available() -> bool {
    which_binary("manim") || which_binary("python3")
}

fn detect_gl_available(has_display: bool) -> bool {
    has_display && (which_binary("manimgl") || which_binary("python3"))
}

fn which_binary(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_binary_finds_something_on_path() {
        // `sh` is present on every CI and dev box this crate targets.
        assert!(which_binary("sh") || which_binary("sh.exe"));
    }

    #[test]
    fn probe_is_idempotent() {
        let first = EnvironmentProbe::get();
        let second = EnvironmentProbe::get();
        assert_eq!(first.is_docker, second.is_docker);
        assert_eq!(first.has_gpu, second.has_gpu);
    }
}
