//! Interactive controller prologue, generated from a small template
//! rather than string-spliced into the generated scene code.
//!
//! The wrapper imports the generated `MainScene` and delegates to it,
//! opening a WebSocket client to the session's control port and feeding
//! received commands onto a thread-safe queue the scene polls during
//! its update loop.

const WRAPPER_TEMPLATE: &str = r#"import queue
import threading
import json
import websocket

from scene import MainScene as _GeneratedScene

COMMAND_QUEUE = queue.Queue()


def _on_message(ws, message):
    try:
        COMMAND_QUEUE.put(json.loads(message))
    except json.JSONDecodeError:
        pass


def _run_controller():
    ws = websocket.WebSocketApp(
        "ws://localhost:{port}/",
        on_message=_on_message,
    )
    ws.run_forever()


class MainScene(_GeneratedScene):
    def setup(self):
        super().setup()
        threading.Thread(target=_run_controller, daemon=True).start()

    def construct(self):
        super().construct()
"#;

/// Render the wrapper module for a session bound to `port`.
pub fn render_wrapper(port: u16) -> String {
    WRAPPER_TEMPLATE.replace("{port}", &port.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_embeds_the_session_port() {
        let rendered = render_wrapper(8766);
        assert!(rendered.contains("ws://localhost:8766/"));
    }

    #[test]
    fn wrapper_delegates_to_generated_scene() {
        let rendered = render_wrapper(8765);
        assert!(rendered.contains("from scene import MainScene as _GeneratedScene"));
        assert!(rendered.contains("class MainScene(_GeneratedScene)"));
    }
}
