//! Interactive session manager: per-session port allocation, a
//! templated controller prologue, and a WebSocket command server
//! fronting a GL renderer child process in presenter mode.

pub mod manager;
pub mod port;
pub mod template;

pub use manager::{InteractiveSession, SessionTable};
pub use port::{allocate_port, PortExhaustionError, BASE_PORT, WINDOW_SIZE};
