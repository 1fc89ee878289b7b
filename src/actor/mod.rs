//! Actor System for the sync server
//!
//! Message-passing concurrency for serve mode:
//!
//! ```text
//! FsActor --[Reload]--> WsActor --[broadcast]--> editor clients
//! (watch)               (sessions)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher, change tracker and notification gate
//! - `ws` - Session registry and request handlers
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
