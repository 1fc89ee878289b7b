//! Editor Connection Protocol
//!
//! Defines the JSON envelope exchanged over the persistent WebSocket
//! connection between the editor client and the sync server.
//!
//! ```text
//! { "id": "18c3f0a2b4e1d2c3", "type": 4, "data": { "content": "..." } }
//! ```
//!
//! # Modules
//!
//! - `message` - Envelope, message kinds and payload shapes
//! - `id` - Request id generation

pub mod id;
pub mod message;

pub use id::generate_id;
pub use message::{
    Envelope, MessageKind, MessagePayload, PUSH_ID, PathPayload, ProtocolError, TreeKind,
    TreeListing, TreeRequest, WritePayload,
};
