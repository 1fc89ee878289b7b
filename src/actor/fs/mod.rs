//! FileSystem Actor
//!
//! Watches the three roots and turns file changes into RELOAD pushes.
//! Implements the "Watcher-First" pattern: the watcher starts before the
//! initial scan so no event is lost in between.
//!
//! Architecture:
//! ```text
//! Watcher → Classifier (roots, kinds) → Tracker update → Ledger gate → WsMsg::Reload
//! ```
//!
//! Roots:
//! - config directory, non-recursive (internal scripts)
//! - project root, recursive
//! - component root, recursive

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode};
use tokio::sync::mpsc;

use super::messages::WsMsg;
use crate::core::ServerContext;

// Raw event → tracked root mapping.
mod classifier;
// Per-path notification gate.
mod ledger;
// Tree updates and notification decisions.
mod processor;
// In-memory file trees.
pub mod tracker;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;


pub use tracker::{ChangeTracker, FileEntry, FileTree};

use processor::ChangeProcessor;
use watch_roots::WatchRoots;

/// How often missing roots are re-attached
const MAINTAIN_INTERVAL: Duration = Duration::from_secs(1);

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    /// Watch-root consistency layer (attach/re-attach root directories)
    watch_roots: WatchRoots,
    /// Channel to send reloads to WsActor
    ws_tx: mpsc::Sender<WsMsg>,
    processor: ChangeProcessor,
}

impl FsActor {
    /// Create a new FsActor with Watcher-First pattern
    ///
    /// The watcher starts immediately, buffering events while the caller
    /// performs the initial scan.
    pub fn new(ctx: Arc<ServerContext>, ws_tx: mpsc::Sender<WsMsg>) -> notify::Result<Self> {
        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(Self::roots(&ctx));
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            ws_tx,
            processor: ChangeProcessor::new(ctx),
        })
    }

    fn roots(ctx: &ServerContext) -> Vec<(PathBuf, RecursiveMode)> {
        let config = &ctx.config;
        vec![
            (config.root.clone(), RecursiveMode::NonRecursive),
            (config.project_dir(), RecursiveMode::Recursive),
            (config.components_dir(), RecursiveMode::Recursive),
        ]
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let notify_rx = self.notify_rx;
        let ws_tx = self.ws_tx;
        let mut processor = self.processor;
        let mut watcher = self.watcher;
        let mut watch_roots = self.watch_roots;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Spawn a thread to poll notify events and send to async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        let mut maintain = tokio::time::interval(MAINTAIN_INTERVAL);
        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => {
                    let Some(event) = event else { break };
                    for path in processor.process(&event, Instant::now()) {
                        if ws_tx.send(WsMsg::Reload { path }).await.is_err() {
                            return; // WsActor shut down
                        }
                    }
                }
                _ = maintain.tick() => watch_roots.maintain(&mut watcher),
            }
        }
    }
}
