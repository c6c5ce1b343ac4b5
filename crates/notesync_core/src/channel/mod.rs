//! Real-time message channel.
//!
//! A bidirectional byte channel shared with the other collaborators. Frames
//! on it are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "operation", "ops": [{"retain": 3}, {"insert": "x"}]}
//! {"type": "snapshot",  "ops": [{"insert": "full document\n"}]}
//! ```
//!
//! Operations are incremental edits applied by every peer. Snapshots are
//! full-document saves meant for the relay to persist; peers ignore them.

mod memory;
#[cfg(feature = "native-sync")]
mod websocket;

use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::error::Result;
use crate::store::BoxFuture;

pub use memory::MemoryChannel;
#[cfg(feature = "native-sync")]
pub use websocket::WebSocketChannel;

/// A message on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// An incremental edit.
    Operation(Delta),
    /// A full-document save request.
    Snapshot(Delta),
}

impl Frame {
    /// Serialize to the JSON wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a frame received from the channel.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The delta carried by the frame.
    pub fn delta(&self) -> &Delta {
        match self {
            Frame::Operation(delta) | Frame::Snapshot(delta) => delta,
        }
    }
}

/// Outbound half of a message channel.
///
/// Inbound messages are delivered separately, as a stream of raw payloads
/// handed to [`SyncSession::run_inbound`](crate::sync::SyncSession::run_inbound).
pub trait MessageChannel: Send + Sync {
    /// Queue `payload` for delivery to the other peers.
    fn send(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>>;

    /// Close the channel. Later sends fail.
    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_frame_shape() {
        let frame = Frame::Operation(Delta::new().retain(3, None).insert("x", None));
        let value: serde_json::Value = serde_json::from_slice(&frame.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "operation", "ops": [{"retain": 3}, {"insert": "x"}]})
        );
    }

    #[test]
    fn test_decode_snapshot() {
        let frame = Frame::decode(br#"{"type":"snapshot","ops":[{"insert":"doc"}]}"#).unwrap();
        assert_eq!(frame, Frame::Snapshot(Delta::new().insert("doc", None)));
    }

    #[test]
    fn test_decode_rejects_untagged_and_garbage() {
        assert!(Frame::decode(br#"{"ops":[{"insert":"x"}]}"#).is_err());
        assert!(Frame::decode(br#"{"type":"cursor","index":3}"#).is_err());
        assert!(Frame::decode(b"not json").is_err());
    }

    #[test]
    fn test_missing_ops_decodes_empty() {
        let frame = Frame::decode(br#"{"type":"operation"}"#).unwrap();
        assert!(frame.delta().is_empty());
    }
}
