use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::FsActor;
use crate::actor::messages::WsMsg;
use crate::actor::ws::WsActor;

/// Run all actors concurrently.
pub(super) async fn run_actors(
    fs: Option<FsActor>,
    ws: WsActor,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Receiver<()>,
) -> Result<()> {
    let ws_handle = tokio::spawn(async move { ws.run().await });
    let fs_handle = fs.map(|fs| tokio::spawn(async move { fs.run().await }));

    loop {
        if shutdown_rx.try_recv().is_ok() || crate::core::is_shutdown() {
            crate::debug!("actor"; "shutdown signal received");
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if let Some(handle) = fs_handle {
        handle.abort();
    }

    crate::debug!("actor"; "sending shutdown to ws");
    let _ = ws_tx.send(WsMsg::Shutdown).await;
    let _ = tokio::time::timeout(Duration::from_millis(500), ws_handle).await;

    Ok(())
}
