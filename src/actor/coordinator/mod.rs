//! Actor Coordinator - Wires up the sync server's actor system
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Starts the WebSocket acceptor
//! - Starts the watcher, then performs the initial scan
//! - Runs the actors until shutdown

mod runtime;

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::WsMsg;
use super::ws::WsActor;
use crate::core::ServerContext;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - owns the actors between setup and `run`.
pub struct Coordinator {
    fs: Option<FsActor>,
    ws: WsActor,
    ws_tx: mpsc::Sender<WsMsg>,
    ws_port: u16,
    shutdown_rx: Receiver<()>,
}

impl Coordinator {
    /// Bind the WebSocket port, attach the watcher and scan both trees.
    ///
    /// Needs no async runtime, so the caller can report the bound port
    /// before spawning the actor thread.
    pub fn new(ctx: Arc<ServerContext>, shutdown_rx: Receiver<()>) -> Result<Self> {
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
        let serve = &ctx.config.serve;

        let ws_port =
            crate::reload::server::start_ws_server(serve.interface, serve.ws_port, ws_tx.clone())?;

        // Watcher first, so changes during the scan are not lost
        let fs = if serve.watch {
            let actor = FsActor::new(Arc::clone(&ctx), ws_tx.clone())
                .context("failed to start file watcher")?;
            Some(actor)
        } else {
            None
        };

        let (project, components) = ctx.scan_all();
        crate::log!(
            "watch";
            "tracking {} project files, {} components",
            project.len(),
            components.len()
        );

        let ws = WsActor::new(ws_rx, ws_tx.clone(), ctx);

        Ok(Self {
            fs,
            ws,
            ws_tx,
            ws_port,
            shutdown_rx,
        })
    }

    /// Port the WebSocket acceptor is actually bound to.
    pub fn ws_port(&self) -> u16 {
        self.ws_port
    }

    /// Run the actor system until the shutdown signal.
    pub async fn run(self) -> Result<()> {
        crate::debug!("actor"; "start");
        runtime::run_actors(self.fs, self.ws, self.ws_tx, self.shutdown_rx).await?;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
