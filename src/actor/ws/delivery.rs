use tungstenite::protocol::Message;

use super::{ClientId, WsActor};
use crate::protocol::Envelope;

impl WsActor {
    /// Broadcast a push to every registered client, the writer included.
    pub(super) fn broadcast(&mut self, envelope: &Envelope) {
        let msg = Message::Text(envelope.to_json().into());
        let mut failed = Vec::new();
        let count;
        {
            let mut sockets = self.sockets.lock();
            count = sockets.len();
            if count == 0 {
                crate::debug!("ws"; "no clients connected");
                return;
            }
            for (&id, ws) in sockets.iter_mut() {
                if let Err(e) = ws.send(msg.clone())
                    && !is_would_block(&e)
                {
                    crate::debug!("ws"; "client {} disconnected: {}", id, e);
                    failed.push(id);
                }
            }
        }

        for id in failed {
            self.remove_client(id);
        }
        crate::debug!("ws"; "broadcast to {} clients", count);
    }

    /// Send a reply to one client
    pub(super) fn send_to(&mut self, client: ClientId, envelope: &Envelope) {
        let msg = Message::Text(envelope.to_json().into());
        let result = match self.sockets.lock().get_mut(&client) {
            Some(ws) => ws.send(msg),
            None => return,
        };

        if let Err(e) = result
            && !is_would_block(&e)
        {
            crate::debug!("ws"; "client {} disconnected: {}", client, e);
            self.remove_client(client);
        }
    }
}

/// Non-blocking socket with a full send buffer: the frame stays queued and
/// goes out with the next write.
fn is_would_block(error: &tungstenite::Error) -> bool {
    matches!(error, tungstenite::Error::Io(e) if e.kind() == std::io::ErrorKind::WouldBlock)
}
