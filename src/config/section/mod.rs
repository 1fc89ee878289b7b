//! Configuration section definitions.
//!
//! | Section     | Purpose                                           |
//! |-------------|---------------------------------------------------|
//! | `[project]` | Watched roots, index document, ignored dirs       |
//! | `[serve]`   | HTTP + WebSocket servers, watcher, script routes  |
//! | `[client]`  | Editor client connection settings                 |

mod client;
mod project;
mod serve;

pub use client::ClientConfig;
pub use project::ProjectConfig;
pub use serve::ServeConfig;
