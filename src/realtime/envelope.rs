//! Wire-format message types for the realtime channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// A typed, timestamped message exchanged over a WebSocket connection.
///
/// Immutable after construction; the timestamp is assigned once when the
/// envelope is created, not when it is sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEnvelope {
    /// Event kind, e.g. "connection", "pong", "report_ready"
    #[serde(rename = "type")]
    pub kind: String,
    /// Event-specific payload fields
    pub data: Value,
    /// Creation time, serialized as RFC 3339
    pub timestamp: DateTime<Utc>,
}

impl WsEnvelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// Handshake acknowledgement sent right after a connection registers.
    pub fn connection(identity: &str) -> Self {
        Self::new(
            "connection",
            json!({
                "status": "connected",
                "message": "Connected to BluePeak Compass real-time updates",
                "user_id": identity,
            }),
        )
    }

    /// Reply to a client `ping`.
    pub fn pong() -> Self {
        Self::new("pong", json!({ "timestamp": Utc::now().to_rfc3339() }))
    }

    /// Acknowledge a `subscribe` request by echoing the requested topics.
    ///
    /// Topic-scoped delivery is not implemented; this is an acknowledgement
    /// contract only and fan-out stays all-or-nothing per identity/global.
    pub fn subscription(topics: &[String]) -> Self {
        Self::new(
            "subscription",
            json!({ "status": "subscribed", "topics": topics }),
        )
    }

    /// Error reply for a single bad inbound message.
    pub fn error(message: &str) -> Self {
        Self::new("error", json!({ "message": message }))
    }
}

/// Decoded inbound client message.
///
/// A closed enum so every inbound kind is handled explicitly; anything the
/// server does not recognize lands in `Other` and is echoed back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Ping,
    Subscribe { topics: Vec<String> },
    Other(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON format")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Message must be a JSON object")]
    NotAnObject,
}

/// Decode one inbound text frame.
///
/// Malformed payloads are reported to the caller so it can answer with an
/// `error` envelope; they never terminate the connection.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    match obj.get("type").and_then(Value::as_str) {
        Some("ping") => Ok(ClientMessage::Ping),
        Some("subscribe") => {
            let topics = obj
                .get("data")
                .and_then(|d| d.get("topics"))
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            Ok(ClientMessage::Subscribe { topics })
        }
        _ => Ok(ClientMessage::Other(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_format() {
        let envelope = WsEnvelope::new("report_ready", json!({ "report_id": "r-1" }));
        let wire: Value = serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();

        assert_eq!(wire["type"], "report_ready");
        assert_eq!(wire["data"]["report_id"], "r-1");
        // RFC 3339 timestamp string
        assert!(wire["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_connection_envelope_carries_identity() {
        let envelope = WsEnvelope::connection("u1");
        assert_eq!(envelope.kind, "connection");
        assert_eq!(envelope.data["status"], "connected");
        assert_eq!(envelope.data["user_id"], "u1");
    }

    #[test]
    fn test_parse_ping() {
        let msg = parse_client_message(r#"{"type": "ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn test_parse_subscribe_with_topics() {
        let msg =
            parse_client_message(r#"{"type": "subscribe", "data": {"topics": ["trends"]}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                topics: vec!["trends".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_subscribe_without_topics_defaults_empty() {
        let msg = parse_client_message(r#"{"type": "subscribe"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Subscribe { topics: vec![] });
    }

    #[test]
    fn test_parse_unknown_type_is_passthrough() {
        let raw = r#"{"type": "custom", "data": {}}"#;
        let msg = parse_client_message(raw).unwrap();
        assert_eq!(msg, ClientMessage::Other(raw.to_string()));
    }

    #[test]
    fn test_parse_missing_type_is_passthrough() {
        let raw = r#"{"hello": "world"}"#;
        let msg = parse_client_message(raw).unwrap();
        assert_eq!(msg, ClientMessage::Other(raw.to_string()));
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        let err = parse_client_message("not json").unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON format");
    }

    #[test]
    fn test_parse_non_object_is_error() {
        assert!(parse_client_message("[1, 2, 3]").is_err());
    }
}
