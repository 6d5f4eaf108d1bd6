//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.
//! Document bodies travel as raw JSON; only the clients interpret them.

use chrono::{DateTime, Utc};
use seatplan_core::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Full value of a document as pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub key: ResourceKey,
    /// `None` if the document has never been written
    pub body: Option<Value>,
    pub revision: u64,
    pub updated_at: Option<DateTime<Utc>>,
    /// Client whose write produced this value
    pub writer: Option<Uuid>,
}

/// Network protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// First message from a client
    Hello { client_id: Uuid },

    /// Server accepts the client
    Welcome { server_time: DateTime<Utc> },

    /// Server refuses the client
    Rejected { reason: String },

    /// Fetch a document once
    Read { request_id: u64, key: ResourceKey },

    ReadResult {
        request_id: u64,
        key: ResourceKey,
        body: Option<Value>,
    },

    /// Replace a document
    Write {
        request_id: u64,
        key: ResourceKey,
        body: Value,
    },

    WriteAck { request_id: u64, revision: u64 },

    /// A read or write could not be served
    RequestFailed { request_id: u64, reason: String },

    /// Receive the current value now and after every change
    Subscribe { key: ResourceKey },

    Snapshot(DocumentSnapshot),

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatplan_core::Side;
    use serde_json::json;

    #[test]
    fn test_snapshot_wire_shape() {
        let msg = Message::Snapshot(DocumentSnapshot {
            key: ResourceKey::Roster(Side::Groom),
            body: Some(json!({ "names": ["Alice"] })),
            revision: 3,
            updated_at: None,
            writer: None,
        });

        let value: Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(value["type"], "Snapshot");
        assert_eq!(value["key"], "guests/groom");
        assert_eq!(value["body"]["names"][0], "Alice");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let raw = br#"{"type":"Subscribe","key":"guests/usher"}"#;
        assert!(Message::from_bytes(raw).is_err());
    }
}
