//! Server-wide owned state.
//!
//! One `ServerContext` is built at startup and handed to every actor and
//! to the HTTP server. The file trees sit behind a lock because the fs
//! actor writes them while the WebSocket actor and HTTP workers read them
//! from other threads.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::actor::fs::ChangeTracker;
use crate::config::SyncConfig;
use crate::protocol::TreeKind;

pub struct ServerContext {
    pub config: Arc<SyncConfig>,
    pub tracker: RwLock<ChangeTracker>,
}

impl ServerContext {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        let tracker = RwLock::new(ChangeTracker::new(&config));
        Self { config, tracker }
    }

    /// Initial scan of both trees. Returns the (project, component) keys found.
    pub fn scan_all(&self) -> (Vec<String>, Vec<String>) {
        let mut tracker = self.tracker.write();
        let project = tracker.rescan(TreeKind::Project);
        let components = tracker.rescan(TreeKind::Component);
        (project, components)
    }
}
