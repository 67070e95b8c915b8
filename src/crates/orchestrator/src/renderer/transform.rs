//! String-level, idempotent rewrite between the Standard and GL code
//! dialects emitted by the code generator.

use super::select::RendererKind;

const STANDARD_IMPORT: &str = "from manim import *";
const GL_IMPORT: &str = "from manimlib import *";

/// Rewrite `code` so it targets `target`. Safe to call repeatedly: a
/// program already in the target dialect passes through unchanged.
pub fn transform_code(code: &str, target: RendererKind) -> String {
    match target {
        RendererKind::Standard => to_standard(code),
        RendererKind::GL => to_gl(code),
    }
}

fn to_standard(code: &str) -> String {
    let mut out = code.replace(GL_IMPORT, STANDARD_IMPORT);
    out = rewrite_camera_calls_to_standard(&out);
    out = rewrite_ambient_rotation_to_standard(&out);
    out
}

fn to_gl(code: &str) -> String {
    let mut out = code.replace(STANDARD_IMPORT, GL_IMPORT);
    out = rewrite_camera_calls_to_gl(&out);
    out = rewrite_ambient_rotation_to_gl(&out);
    out
}

/// `self.set_camera_orientation(phi=.., theta=..)` -> GL's
/// `self.camera.frame.set_euler_angles(phi=.., theta=..)`.
fn rewrite_camera_calls_to_gl(code: &str) -> String {
    let marker = "self.set_camera_orientation(";
    if !code.contains(marker) {
        return code.to_string();
    }
    code.replace(marker, "self.camera.frame.set_euler_angles(")
}

fn rewrite_camera_calls_to_standard(code: &str) -> String {
    let marker = "self.camera.frame.set_euler_angles(";
    if !code.contains(marker) {
        return code.to_string();
    }
    code.replace(marker, "self.set_camera_orientation(")
}

/// `self.begin_ambient_camera_rotation(rate=..)` / `self.stop_ambient_camera_rotation()`
/// -> GL's updater-based equivalents.
fn rewrite_ambient_rotation_to_gl(code: &str) -> String {
    let mut out = code.to_string();
    if let Some(start) = out.find("self.begin_ambient_camera_rotation(rate=") {
        let rest = &out[start + "self.begin_ambient_camera_rotation(rate=".len()..];
        if let Some(end) = rest.find(')') {
            let rate = rest[..end].trim().to_string();
            let replacement = format!(
                "self.camera.frame.add_updater(lambda m, dt: m.increment_theta({rate} * dt))"
            );
            out.replace_range(start..start + "self.begin_ambient_camera_rotation(rate=".len() + end + 1, &replacement);
        }
    }
    out.replace(
        "self.stop_ambient_camera_rotation()",
        "self.camera.frame.clear_updaters()",
    )
}

fn rewrite_ambient_rotation_to_standard(code: &str) -> String {
    let mut out = code.to_string();
    if let Some(start) = out.find("self.camera.frame.add_updater(lambda m, dt: m.increment_theta(") {
        let prefix_len = "self.camera.frame.add_updater(lambda m, dt: m.increment_theta(".len();
        let rest = &out[start + prefix_len..];
        if let Some(end) = rest.find(" * dt))") {
            let rate = rest[..end].trim().to_string();
            let full_end = start + prefix_len + end + " * dt))".len();
            let replacement = format!("self.begin_ambient_camera_rotation(rate={rate})");
            out.replace_range(start..full_end, &replacement);
        }
    }
    out.replace(
        "self.camera.frame.clear_updaters()",
        "self.stop_ambient_camera_rotation()",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_import_line_to_gl() {
        let code = "from manim import *\nclass MainScene(ThreeDScene):\n    pass\n";
        let out = transform_code(code, RendererKind::GL);
        assert!(out.contains(GL_IMPORT));
        assert!(!out.contains(STANDARD_IMPORT));
    }

    #[test]
    fn rewrites_import_line_to_standard() {
        let code = "from manimlib import *\nclass MainScene(ThreeDScene):\n    pass\n";
        let out = transform_code(code, RendererKind::Standard);
        assert!(out.contains(STANDARD_IMPORT));
        assert!(!out.contains(GL_IMPORT));
    }

    #[test]
    fn transform_to_gl_is_idempotent() {
        let code = "from manim import *\nself.set_camera_orientation(phi=75 * DEGREES, theta=-45 * DEGREES)\nself.begin_ambient_camera_rotation(rate=0.2)\n";
        let once = transform_code(code, RendererKind::GL);
        let twice = transform_code(&once, RendererKind::GL);
        assert_eq!(once, twice);
    }

    #[test]
    fn transform_to_standard_is_idempotent() {
        let code = "from manimlib import *\nself.camera.frame.set_euler_angles(phi=75 * DEGREES, theta=-45 * DEGREES)\nself.camera.frame.add_updater(lambda m, dt: m.increment_theta(0.2 * dt))\n";
        let once = transform_code(code, RendererKind::Standard);
        let twice = transform_code(&once, RendererKind::Standard);
        assert_eq!(once, twice);
    }

    #[test]
    fn round_trip_preserves_rate() {
        let code = "from manim import *\nself.begin_ambient_camera_rotation(rate=0.3)\n";
        let gl = transform_code(code, RendererKind::GL);
        let back = transform_code(&gl, RendererKind::Standard);
        assert!(back.contains("rate=0.3"));
    }
}
