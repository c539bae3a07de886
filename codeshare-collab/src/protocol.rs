//! JSON wire protocol for buffer synchronization.
//!
//! Every frame is a WebSocket text message carrying one event:
//! ```text
//! client → server   {"event":"code-change","data":"<full buffer>"}
//! server → client   {"event":"update-code","data":"<full buffer>"}
//! ```
//!
//! Payloads are always the complete buffer, never a diff. Frames are small
//! source-code buffers, so a text encoding keeps browser clients trivial.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for a single participant connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Events sent by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// The participant's buffer after a local edit.
    #[serde(rename = "code-change")]
    CodeChange(String),
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Canonical buffer content, either after another participant's edit
    /// or as the initial snapshot on connect.
    #[serde(rename = "update-code")]
    UpdateCode(String),
}

impl ClientEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

impl ServerEvent {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),
    #[error("Connection closed")]
    ConnectionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_change_wire_shape() {
        let text = ClientEvent::CodeChange("print(1)".into()).encode().unwrap();
        assert_eq!(text, r#"{"event":"code-change","data":"print(1)"}"#);
    }

    #[test]
    fn test_update_code_wire_shape() {
        let text = ServerEvent::UpdateCode("x = 2\n".into()).encode().unwrap();
        assert_eq!(text, r#"{"event":"update-code","data":"x = 2\n"}"#);
    }

    #[test]
    fn test_decode_code_change() {
        let event = ClientEvent::decode(r#"{"event":"code-change","data":"a\tb"}"#).unwrap();
        assert_eq!(event, ClientEvent::CodeChange("a\tb".into()));
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let err = ClientEvent::decode(r#"{"event":"run","data":"x"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
    }

    #[test]
    fn test_decode_rejects_non_string_payload() {
        assert!(ClientEvent::decode(r#"{"event":"code-change","data":42}"#).is_err());
        assert!(ClientEvent::decode("not json").is_err());
    }

    #[test]
    fn test_server_event_is_not_a_client_event() {
        let text = ServerEvent::UpdateCode("x".into()).encode().unwrap();
        assert!(ClientEvent::decode(&text).is_err());
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }
}
