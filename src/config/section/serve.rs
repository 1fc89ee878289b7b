//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 8080                 # HTTP port number
//! ws_port = 8090              # Editor connection port
//! watch = true                # Track file changes and push reloads
//! notify_window_ms = 100      # Minimum interval between reloads per path
//!
//! [serve.scripts]
//! "editor.js" = "editor_client.js"
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port for editor connections.
    pub ws_port: u16,

    /// Enable file watcher and reload notifications.
    pub watch: bool,

    /// Reload notifications for the same path closer than this are dropped.
    pub notify_window_ms: u64,

    /// Internal script routes: URL name → file (relative to the config dir).
    pub scripts: BTreeMap<String, PathBuf>,
}

impl ServeConfig {
    pub fn notify_window(&self) -> Duration {
        Duration::from_millis(self.notify_window_ms)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            ws_port: 8090,
            watch: true,
            notify_window_ms: 100,
            scripts: BTreeMap::new(),
        }
    }
}
