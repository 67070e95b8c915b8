//! TCP port allocation for interactive session WebSocket servers.

use thiserror::Error;
use tokio::net::TcpListener;

/// First port probed when allocating a session socket.
pub const BASE_PORT: u16 = 8765;

/// Width of the probe window; the source's fixed-window-of-10 search,
/// made explicit here as a named constant instead of a magic loop bound.
pub const WINDOW_SIZE: u16 = 10;

#[derive(Debug, Error)]
#[error("no free port found in {base}..{end} ({window} candidates exhausted)", end = base + window)]
pub struct PortExhaustionError {
    pub base: u16,
    pub window: u16,
}

/// Probe `BASE_PORT..BASE_PORT + WINDOW_SIZE` for a free port and return
/// the bound listener itself, so the caller never releases-then-rebinds
/// (which would race another session for the same port). Returns a
/// typed exhaustion error (rather than panicking) if the whole window is
/// taken, since session churn under load can plausibly exhaust it.
pub async fn allocate_port() -> Result<(u16, TcpListener), PortExhaustionError> {
    for offset in 0..WINDOW_SIZE {
        let candidate = BASE_PORT + offset;
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", candidate)).await {
            return Ok((candidate, listener));
        }
    }
    Err(PortExhaustionError { base: BASE_PORT, window: WINDOW_SIZE })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocates_a_port_within_the_window() {
        let (port, _listener) = allocate_port().await.unwrap();
        assert!((BASE_PORT..BASE_PORT + WINDOW_SIZE).contains(&port));
    }

    #[tokio::test]
    async fn exhaustion_error_names_the_window() {
        let err = PortExhaustionError { base: BASE_PORT, window: WINDOW_SIZE };
        assert!(err.to_string().contains("8765"));
    }
}
