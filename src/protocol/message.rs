//! Envelope and payload types.
//!
//! | type | direction | data |
//! |------|-----------|------|
//! | `ACK(0)` / `FAIL(1)` | server → client | response payload, echoes request id |
//! | `INIT(2)` | client → server | `{path}` |
//! | `RELOAD(3)` | server → client | `{path}` |
//! | `WRITE(4)` | client → server | `{content}` |
//! | `TREE(5)` | client → server | `{type: 0=component, 1=project}` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Id carried by messages that do not expect a response (INIT, RELOAD).
pub const PUSH_ID: &str = "0";

/// Protocol violations. Logged and dropped, never fatal.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("malformed {kind:?} payload: {source}")]
    Payload {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown message type: {0}")]
    UnknownKind(i64),

    #[error("response for unknown request id: {0}")]
    UnknownId(String),

    #[error("connection not ready")]
    NotReady,
}

// =============================================================================
// Message kinds
// =============================================================================

/// Message kind, encoded as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MessageKind {
    Ack,
    Fail,
    Init,
    Reload,
    Write,
    Tree,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Fail => "fail",
            Self::Init => "init",
            Self::Reload => "reload",
            Self::Write => "write",
            Self::Tree => "tree",
        }
    }
}

impl From<MessageKind> for i64 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Ack => 0,
            MessageKind::Fail => 1,
            MessageKind::Init => 2,
            MessageKind::Reload => 3,
            MessageKind::Write => 4,
            MessageKind::Tree => 5,
        }
    }
}

impl TryFrom<i64> for MessageKind {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ack),
            1 => Ok(Self::Fail),
            2 => Ok(Self::Init),
            3 => Ok(Self::Reload),
            4 => Ok(Self::Write),
            5 => Ok(Self::Tree),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

/// Which file tree a TREE request lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Component,
    Project,
}

impl TreeKind {
    pub fn code(self) -> i64 {
        match self {
            Self::Component => 0,
            Self::Project => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Component),
            1 => Some(Self::Project),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Project => "project",
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// `INIT` and `RELOAD` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPayload {
    pub path: String,
}

/// `WRITE` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePayload {
    pub content: String,
}

/// `TREE` request payload. The code stays raw so unknown kinds can be
/// reported back to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRequest {
    #[serde(rename = "type")]
    pub kind: i64,
}

/// `ACK`/`FAIL` payload carrying a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
}

/// `ACK` payload for a TREE request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeListing {
    pub tree: Vec<String>,
}

// =============================================================================
// Envelope
// =============================================================================

/// The `{id, type, data}` unit exchanged over the connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: Value,
}

/// Wire shape before the kind is validated.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    pub fn new(id: impl Into<String>, kind: MessageKind, data: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
        }
    }

    fn with_payload<T: Serialize>(id: impl Into<String>, kind: MessageKind, payload: &T) -> Self {
        let data = serde_json::to_value(payload).unwrap_or(Value::Null);
        Self::new(id, kind, data)
    }

    /// Create an acknowledge response
    pub fn ack<T: Serialize>(id: impl Into<String>, payload: &T) -> Self {
        Self::with_payload(id, MessageKind::Ack, payload)
    }

    /// Create a failure response with a user-facing message
    pub fn fail(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_payload(
            id,
            MessageKind::Fail,
            &MessagePayload {
                message: message.into(),
            },
        )
    }

    /// Create a reload push for a changed path
    pub fn reload(path: impl Into<String>) -> Self {
        Self::with_payload(PUSH_ID, MessageKind::Reload, &PathPayload { path: path.into() })
    }

    /// Create the handshake announcing the client's current location
    pub fn init(path: impl Into<String>) -> Self {
        Self::with_payload(PUSH_ID, MessageKind::Init, &PathPayload { path: path.into() })
    }

    /// Whether this is a response (ACK or FAIL)
    pub fn is_response(&self) -> bool {
        matches!(self.kind, MessageKind::Ack | MessageKind::Fail)
    }

    /// Decode the payload into its typed shape
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.data).map_err(|source| ProtocolError::Payload {
            kind: self.kind,
            source,
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"id":"{}","type":{},"data":null}}"#, PUSH_ID, i64::from(self.kind))
        })
    }

    /// Parse from JSON string
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        let kind = MessageKind::try_from(raw.kind)?;
        Ok(Self {
            id: raw.id,
            kind,
            data: raw.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_codes_match_wire_table() {
        let expected = [
            (MessageKind::Ack, 0),
            (MessageKind::Fail, 1),
            (MessageKind::Init, 2),
            (MessageKind::Reload, 3),
            (MessageKind::Write, 4),
            (MessageKind::Tree, 5),
        ];
        for (kind, code) in expected {
            assert_eq!(i64::from(kind), code);
            assert_eq!(MessageKind::try_from(code).unwrap(), kind);
        }
    }

    #[test]
    fn test_reload_message() {
        let json = Envelope::reload("index.html").to_json();
        assert!(json.contains(r#""type":3"#));
        assert!(json.contains(r#""id":"0""#));
        assert!(json.contains(r#""path":"index.html""#));
    }

    #[test]
    fn test_fail_message() {
        let msg = Envelope::fail("abc", "File not found!");
        assert_eq!(msg.kind, MessageKind::Fail);
        assert_eq!(msg.data, json!({ "message": "File not found!" }));
    }

    #[test]
    fn test_parse_tree_request() {
        let env = Envelope::from_json(r#"{"id":"42","type":5,"data":{"type":1}}"#).unwrap();
        assert_eq!(env.id, "42");
        assert_eq!(env.kind, MessageKind::Tree);
        let req: TreeRequest = env.payload().unwrap();
        assert_eq!(TreeKind::from_code(req.kind), Some(TreeKind::Project));
    }

    #[test]
    fn test_parse_malformed() {
        let err = Envelope::from_json("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = Envelope::from_json(r#"{"id":"1","type":9,"data":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownKind(9)));
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let env = Envelope::from_json(r#"{"id":"1","type":0}"#).unwrap();
        assert_eq!(env.data, Value::Null);
        assert!(env.is_response());
    }

    #[test]
    fn test_payload_shape_mismatch() {
        let env = Envelope::from_json(r#"{"id":"1","type":4,"data":{"text":"x"}}"#).unwrap();
        let err = env.payload::<WritePayload>().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Payload {
                kind: MessageKind::Write,
                ..
            }
        ));
    }
}
