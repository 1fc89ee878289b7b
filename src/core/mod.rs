//! Core types shared across the server.

mod context;
mod state;

pub use context::ServerContext;
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
