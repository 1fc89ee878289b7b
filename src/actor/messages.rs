//! Actor Message Definitions
//!
//! ```text
//! acceptor --AddClient--> WsActor <--Reload-- FsActor
//! reader ----Incoming---> WsActor
//! ```

use std::net::TcpStream;

use super::ws::ClientId;

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// New TCP connection, handshake not yet performed
    AddClient(TcpStream),
    /// Text frame received from a registered client, in arrival order
    Incoming { client: ClientId, text: String },
    /// Client closed or its socket failed
    Disconnected { client: ClientId },
    /// A watched path changed: push RELOAD to every client
    Reload { path: String },
    /// Shutdown
    Shutdown,
}
