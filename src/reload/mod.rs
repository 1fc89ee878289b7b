//! Reload Module
//!
//! Entry point of the persistent editor connection. The acceptor hands raw
//! TCP streams to the WebSocket actor, which performs the handshake.
//!
//! ```text
//! TcpListener -> acceptor thread -> WsActor -> editor clients
//! ```

pub mod server;
