//! JSON frames exchanged over a WebSocket connection.
//!
//! # Wire format
//!
//! Client → server:
//!
//! ```json
//! {"event": "join_room", "data": {"room": "lobby"}, "id": 7}
//! ```
//!
//! Server → client, success and failure:
//!
//! ```json
//! {"event": "join_room:ok", "data": {"room": "lobby"}, "id": 7}
//! {"event": "error", "kind": "validation", "message": "...", "details": {...}, "id": 7}
//! ```
//!
//! `id` is optional and opaque; when present it is echoed so clients can match
//! replies to requests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use trigger_core::SocketEmission;

/// One event sent by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

impl InboundFrame {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// The `serde_json` error when the text is not a frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Best-effort `id` recovery from a frame that failed to parse, so even
    /// the error reply can be correlated.
    pub fn salvage_id(text: &str) -> Option<Value> {
        serde_json::from_str::<Value>(text)
            .ok()?
            .get_mut("id")
            .map(Value::take)
            .filter(|id| !id.is_null())
    }
}

/// One event sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub event: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl OutboundFrame {
    /// Wraps an emission.  Object payloads are inlined; anything else is
    /// carried under `data`.
    pub fn from_emission(emission: SocketEmission, id: Option<Value>) -> Self {
        let payload = match emission.payload {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("data".to_owned(), other);
                fields
            }
        };
        Self {
            event: emission.event,
            payload,
            id,
        }
    }

    /// Serializes to a text frame body.
    ///
    /// # Errors
    ///
    /// The `serde_json` error; only possible for non-string map keys, which
    /// [`Map`] rules out, so callers may log and drop.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
