use thiserror::Error;

use crate::protocol::ProtocolError;

/// Why a request did not resolve with an ACK payload.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server answered FAIL; carries its message.
    #[error("{0}")]
    Failed(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed before a response arrived")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("socket setup failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("not connected")]
    Disconnected,
}
