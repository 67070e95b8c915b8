//! Interactive session lifecycle: port allocation, controller prologue
//! injection, GL renderer child process, and the WebSocket command
//! server.

use super::port::{allocate_port, PortExhaustionError};
use super::template::render_wrapper;
use crate::api::ws::{ClientFrame, CommandType, ServerFrame};
use crate::domain::SessionStatus;
use crate::renderer::{GLRenderer, Renderer};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

/// A live interactive session: one GL renderer child process plus the
/// WebSocket server that drives it.
pub struct InteractiveSession {
    pub session_id: String,
    pub port: u16,
    status: Arc<SyncMutex<SessionStatus>>,
    status_tx: broadcast::Sender<SessionStatus>,
    child: SyncMutex<Option<tokio::process::Child>>,
    scene_path: PathBuf,
    stop_tx: tokio::sync::watch::Sender<bool>,
    stopped_tx: broadcast::Sender<()>,
}

impl InteractiveSession {
    /// Allocate a port, write the instrumented wrapper scene, spawn the
    /// GL renderer in presenter mode, and start the WebSocket server.
    pub async fn start(
        job_id: impl Into<String>,
        generated_code: &str,
        temp_dir: &std::path::Path,
        total_duration: f64,
    ) -> crate::Result<Arc<Self>> {
        let session_id = job_id.into();
        let (port, listener) = allocate_port()
            .await
            .map_err(|e: PortExhaustionError| crate::OrchestratorError::Environment(e.to_string()))?;

        let session_dir = temp_dir.join(&session_id);
        tokio::fs::create_dir_all(&session_dir)
            .await
            .map_err(|e| crate::OrchestratorError::Internal(format!("failed to create session dir: {e}")))?;

        let scene_path = session_dir.join("scene.py");
        let renderer = GLRenderer;
        let transformed = renderer.transform_code(generated_code);
        tokio::fs::write(&scene_path, transformed)
            .await
            .map_err(|e| crate::OrchestratorError::Internal(format!("failed to write scene file: {e}")))?;

        let wrapper_path = session_dir.join("interactive_scene.py");
        tokio::fs::write(&wrapper_path, render_wrapper(port))
            .await
            .map_err(|e| crate::OrchestratorError::Internal(format!("failed to write wrapper file: {e}")))?;

        let child = tokio::process::Command::new("manimgl")
            .arg(wrapper_path.display().to_string())
            .arg("MainScene")
            .arg("--uhd")
            .spawn()
            .ok();

        let status = SessionStatus {
            session_id: session_id.clone(),
            playing: false,
            current_time: 0.0,
            total_duration,
            speed: 1.0,
            connected: 0,
        };
        let (status_tx, _rx) = broadcast::channel(32);
        let (stopped_tx, _rx) = broadcast::channel(1);
        let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);

        let session = Arc::new(Self {
            session_id,
            port,
            status: Arc::new(SyncMutex::new(status)),
            status_tx,
            child: SyncMutex::new(child),
            scene_path,
            stop_tx,
            stopped_tx,
        });

        session.clone().spawn_server(listener, stop_rx);
        Ok(session)
    }

    fn spawn_server(self: Arc<Self>, listener: TcpListener, mut stop_rx: tokio::sync::watch::Receiver<bool>) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                    accepted = listener.accept() => {
                        let Ok((stream, _addr)) = accepted else { continue };
                        let session = Arc::clone(&self);
                        tokio::spawn(async move {
                            session.handle_connection(stream).await;
                        });
                    }
                }
            }
        });
    }

    async fn handle_connection(self: Arc<Self>, stream: tokio::net::TcpStream) {
        let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
        let (mut write, mut read) = ws.split();
        let mut status_rx = self.status_tx.subscribe();
        let mut stopped_rx = self.stopped_tx.subscribe();

        {
            let mut status = self.status.lock();
            status.connected += 1;
        }
        self.broadcast_status();

        loop {
            tokio::select! {
                frame = read.next() => {
                    let Some(Ok(message)) = frame else { break };
                    if let Message::Text(text) = message {
                        let reply = self.handle_frame(&text);
                        if write.send(Message::Text(serde_json::to_string(&reply).unwrap_or_default())).await.is_err() {
                            break;
                        }
                    }
                }
                update = status_rx.recv() => {
                    let Ok(status) = update else { break };
                    let frame = ServerFrame::Status { payload: status, timestamp: now_secs() };
                    if write.send(Message::Text(serde_json::to_string(&frame).unwrap_or_default())).await.is_err() {
                        break;
                    }
                }
                _ = stopped_rx.recv() => {
                    let frame = ServerFrame::Stopped { session_id: self.session_id.clone(), timestamp: now_secs() };
                    let _ = write.send(Message::Text(serde_json::to_string(&frame).unwrap_or_default())).await;
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        {
            let mut status = self.status.lock();
            status.connected = status.connected.saturating_sub(1);
        }
        self.broadcast_status();
    }

    fn handle_frame(&self, raw: &str) -> ServerFrame {
        let parsed: Result<ClientFrame, _> = serde_json::from_str(raw);
        let frame = match parsed {
            Ok(frame) => frame,
            Err(e) => return ServerFrame::Error { error: e.to_string(), timestamp: now_secs() },
        };

        let command = frame.command_type;
        let result = match command {
            CommandType::Play => {
                self.status.lock().playing = true;
                Ok(())
            }
            CommandType::Pause => {
                self.status.lock().playing = false;
                Ok(())
            }
            CommandType::Seek => match frame.payload.as_ref().and_then(|p| p.get("time")).and_then(|v| v.as_f64()) {
                Some(time) => {
                    self.status.lock().current_time = time;
                    Ok(())
                }
                None => Err("seek requires a numeric `time` payload field".to_string()),
            },
            CommandType::Speed => match frame.payload.as_ref().and_then(|p| p.get("speed")).and_then(|v| v.as_f64()) {
                Some(speed) => {
                    self.status.lock().speed = speed;
                    Ok(())
                }
                None => Err("speed requires a numeric `speed` payload field".to_string()),
            },
            CommandType::Stop => {
                self.status.lock().playing = false;
                Ok(())
            }
            CommandType::Reload | CommandType::Camera | CommandType::Screenshot => Ok(()),
        };

        match result {
            Ok(()) => {
                self.broadcast_status();
                ServerFrame::Ack { command, timestamp: now_secs() }
            }
            Err(error) => ServerFrame::Error { error, timestamp: now_secs() },
        }
    }

    fn broadcast_status(&self) {
        let status = self.status.lock().clone();
        let _ = self.status_tx.send(status);
    }

    pub fn status(&self) -> SessionStatus {
        self.status.lock().clone()
    }

    /// Close all client connections, stop the accept loop, terminate the
    /// child process, and delete the temp scene file.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let _ = self.stopped_tx.send(());
        // Give each connection's select loop a beat to flush the
        // `session:stopped` frame and the close handshake before the
        // child process (and its renderer window) goes away.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        if let Some(mut child) = self.child.lock().take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }

        if let Some(parent) = self.scene_path.parent() {
            let _ = tokio::fs::remove_dir_all(parent).await;
        }
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Registry of live interactive sessions, keyed by session (job) id.
pub struct SessionTable {
    sessions: SyncMutex<HashMap<String, Arc<InteractiveSession>>>,
}

impl SessionTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { sessions: SyncMutex::new(HashMap::new()) })
    }

    pub fn insert(&self, session: Arc<InteractiveSession>) {
        self.sessions.lock().insert(session.session_id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<InteractiveSession>> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub async fn remove_and_stop(&self, session_id: &str) {
        let removed = self.sessions.lock().remove(session_id);
        if let Some(session) = removed {
            session.stop().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Ids of every currently-registered session, for shutdown sweeps.
    pub fn ids(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_table_starts_empty() {
        let table = SessionTable::new();
        assert!(table.is_empty());
    }
}
