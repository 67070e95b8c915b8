use serde::{Deserialize, Serialize};

/// Commands an interactive session client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Play,
    Pause,
    Seek,
    Speed,
    Stop,
    Reload,
    Camera,
    Screenshot,
}

/// Client → server frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    pub timestamp: f64,
}

/// Server → client frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Ack {
        command: CommandType,
        timestamp: f64,
    },
    Error {
        error: String,
        timestamp: f64,
    },
    Status {
        payload: crate::domain::SessionStatus,
        timestamp: f64,
    },
    Data {
        command: CommandType,
        payload: serde_json::Value,
        timestamp: f64,
    },
    #[serde(rename = "session:stopped")]
    Stopped {
        session_id: String,
        timestamp: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_parses_seek_with_payload() {
        let raw = r#"{"type": "seek", "payload": {"time": 12.5}, "timestamp": 1690000000.0}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.command_type, CommandType::Seek);
        assert_eq!(frame.payload.unwrap()["time"], 12.5);
    }

    #[test]
    fn server_frame_ack_serializes_with_tag() {
        let frame = ServerFrame::Ack { command: CommandType::Play, timestamp: 1.0 };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["command"], "play");
    }
}
