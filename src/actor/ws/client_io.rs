use std::net::TcpStream;
use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::protocol::Message;

use super::{ClientContext, Sockets, WsActor};
use crate::actor::messages::WsMsg;

/// Pause between polling rounds when no socket had data
const POLL_INTERVAL: Duration = Duration::from_millis(20);

impl WsActor {
    /// Perform the handshake and register the connection with a fresh context.
    pub(super) fn add_client(&mut self, stream: TcpStream) {
        // Keep blocking mode during handshake, switch to non-blocking after
        match tungstenite::accept(stream) {
            Ok(ws) => {
                if let Err(e) = ws.get_ref().set_nonblocking(true) {
                    crate::log!("ws"; "failed to configure socket: {}", e);
                    return;
                }

                let id = self.next_id;
                self.next_id += 1;

                self.sockets.lock().insert(id, ws);
                self.sessions.insert(id, ClientContext::default());
                crate::debug!("ws"; "client {} connected (total: {})", id, self.sessions.len());
            }
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
            }
        }
    }

    /// Background thread: poll every socket and forward frames to the actor.
    ///
    /// The lock is released before forwarding, so the actor can reply while
    /// the next round is collected.
    pub(super) fn client_reader_loop(sockets: Sockets, tx: mpsc::Sender<WsMsg>) {
        loop {
            if crate::core::is_shutdown() {
                break;
            }

            let inbox = Self::read_frames(&sockets);
            let idle = inbox.is_empty();
            for msg in inbox {
                if tx.blocking_send(msg).is_err() {
                    return; // Actor gone
                }
            }

            if idle {
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// One polling round: drain every socket without blocking. Closed or
    /// failed sockets are dropped here and reported as `Disconnected`.
    pub(super) fn read_frames(sockets: &Sockets) -> Vec<WsMsg> {
        let mut inbox = Vec::new();
        let mut guard = sockets.lock();
        let mut disconnected = Vec::new();

        for (&id, ws) in guard.iter_mut() {
            // Drain everything currently buffered on this socket
            loop {
                match ws.read() {
                    Ok(Message::Text(text)) => {
                        inbox.push(WsMsg::Incoming {
                            client: id,
                            text: text.to_string(),
                        });
                    }
                    Ok(Message::Close(_)) => {
                        disconnected.push(id);
                        break;
                    }
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        break;
                    }
                    Err(e) => {
                        crate::debug!("ws"; "client {} read error: {}", id, e);
                        disconnected.push(id);
                        break;
                    }
                }
            }
        }

        for id in disconnected {
            guard.remove(&id);
            inbox.push(WsMsg::Disconnected { client: id });
        }
        inbox
    }
}
