//! WebSocket Actor - Session Registry
//!
//! This actor is responsible for:
//! - Accepting editor connections and giving each a fresh `ClientContext`
//! - Answering INIT / WRITE / TREE requests
//! - Broadcasting RELOAD pushes to every connected client
//!
//! # Architecture
//!
//! ```text
//! FsActor --[Reload]--> WsActor --[broadcast]--> Clients
//!                          ^                       |
//!                          +---[reader thread]-----+
//! ```
//!
//! The reader thread only forwards raw frames. All request handling runs
//! on this actor's loop, one message at a time, so a connection's requests
//! are answered in the order they were sent.

mod client_io;
mod delivery;
mod session;

pub use session::{BindingError, ClientContext, PersistenceError, SAVED_MESSAGE};

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::core::ServerContext;
use crate::protocol::Envelope;

/// Connection handle, unique for the server's lifetime
pub type ClientId = u64;

/// Open sockets, shared between the actor (writes) and the reader thread
type Sockets = Arc<Mutex<FxHashMap<ClientId, WebSocket<TcpStream>>>>;

/// WebSocket Actor - owns every connection and its editing context
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    /// Handed to the reader thread
    tx: mpsc::Sender<WsMsg>,
    ctx: Arc<ServerContext>,
    sockets: Sockets,
    sessions: FxHashMap<ClientId, ClientContext>,
    next_id: ClientId,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>, tx: mpsc::Sender<WsMsg>, ctx: Arc<ServerContext>) -> Self {
        Self {
            rx,
            tx,
            ctx,
            sockets: Arc::new(Mutex::new(FxHashMap::default())),
            sessions: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let sockets = Arc::clone(&self.sockets);
        let tx = self.tx.clone();
        std::thread::spawn(move || Self::client_reader_loop(sockets, tx));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Incoming { client, text } => self.handle_incoming(client, &text),

                WsMsg::Disconnected { client } => self.remove_client(client),

                WsMsg::Reload { path } => {
                    crate::debug!("ws"; "reload: {}", path);
                    self.broadcast(&Envelope::reload(path));
                }

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    let mut sockets = self.sockets.lock();
                    for (_, mut ws) in sockets.drain() {
                        let _ = ws.close(None);
                        let _ = ws.flush();
                    }
                    self.sessions.clear();
                    break;
                }
            }
        }
    }

    fn handle_incoming(&mut self, client: ClientId, text: &str) {
        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                session::log_dropped(client, &e);
                return;
            }
        };

        let Some(session) = self.sessions.get_mut(&client) else {
            crate::debug!("ws"; "message from unregistered client {}", client);
            return;
        };

        if let Some(reply) = session.handle(&envelope, &self.ctx) {
            self.send_to(client, &reply);
        }
    }

    fn remove_client(&mut self, client: ClientId) {
        self.sockets.lock().remove(&client);
        if self.sessions.remove(&client).is_some() {
            crate::debug!("ws"; "client {} disconnected (total: {})", client, self.sessions.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::protocol::MessageKind;
    use serde_json::json;
    use std::fs;
    use std::net::TcpListener;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tungstenite::protocol::Message;
    use tungstenite::stream::MaybeTlsStream;

    type Editor = WebSocket<MaybeTlsStream<TcpStream>>;

    fn make_actor() -> (TempDir, WsActor) {
        let temp = TempDir::new().unwrap();
        let mut config = SyncConfig::default();
        config.set_root(temp.path());
        fs::create_dir_all(config.project_dir()).unwrap();
        fs::create_dir_all(config.components_dir()).unwrap();
        fs::write(config.project_dir().join("index.html"), "<html></html>").unwrap();

        let ctx = ServerContext::new(Arc::new(config));
        ctx.scan_all();
        let (tx, rx) = mpsc::channel(16);
        (temp, WsActor::new(rx, tx, Arc::new(ctx)))
    }

    /// Open an editor connection over loopback and register it.
    fn connect(actor: &mut WsActor) -> Editor {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let editor = std::thread::spawn(move || tungstenite::connect(url).unwrap().0);

        let (stream, _) = listener.accept().unwrap();
        actor.add_client(stream);

        let editor = editor.join().unwrap();
        if let MaybeTlsStream::Plain(stream) = editor.get_ref() {
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        }
        editor
    }

    fn next_envelope(editor: &mut Editor) -> Envelope {
        loop {
            if let Message::Text(text) = editor.read().unwrap() {
                return Envelope::from_json(text.as_str()).unwrap();
            }
        }
    }

    /// Poll the sockets until the disconnect of some client shows up.
    fn read_until_disconnect(actor: &WsActor) -> Vec<WsMsg> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut inbox = Vec::new();
        while Instant::now() < deadline {
            inbox.extend(WsActor::read_frames(&actor.sockets));
            if inbox.iter().any(|msg| matches!(msg, WsMsg::Disconnected { .. })) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        inbox
    }

    #[test]
    fn test_reload_reaches_every_client_including_writer() {
        let (_temp, mut actor) = make_actor();
        let mut writer = connect(&mut actor);
        let mut other = connect(&mut actor);
        assert_eq!(actor.sessions.len(), 2);

        // Ids are handed out in connection order
        actor.handle_incoming(1, &Envelope::init("index.html").to_json());
        let write = Envelope::new("9", MessageKind::Write, json!({ "content": "<p>new</p>" }));
        actor.handle_incoming(1, &write.to_json());

        let ack = next_envelope(&mut writer);
        assert_eq!(ack.kind, MessageKind::Ack);
        assert_eq!(ack.id, "9");

        actor.broadcast(&Envelope::reload("index.html"));
        for editor in [&mut writer, &mut other] {
            let push = next_envelope(editor);
            assert_eq!(push.kind, MessageKind::Reload);
            assert_eq!(push.data, json!({ "path": "index.html" }));
        }
    }

    #[test]
    fn test_disconnect_destroys_client_context() {
        let (_temp, mut actor) = make_actor();
        let mut editor = connect(&mut actor);
        actor.handle_incoming(1, &Envelope::init("index.html").to_json());
        assert!(actor.sessions[&1].current_path().is_some());

        editor.close(None).unwrap();
        let inbox = read_until_disconnect(&actor);
        assert!(matches!(inbox.as_slice(), [WsMsg::Disconnected { client: 1 }]));
        assert!(actor.sockets.lock().is_empty());

        actor.remove_client(1);
        assert!(actor.sessions.is_empty());

        // A late frame from the dropped connection finds no context
        actor.handle_incoming(1, &Envelope::init("index.html").to_json());
        assert!(actor.sessions.is_empty());

        // Reconnecting starts over with an unbound context
        let _again = connect(&mut actor);
        assert!(actor.sessions[&2].current_path().is_none());
    }

    #[test]
    fn test_frames_are_forwarded_in_order() {
        let (_temp, mut actor) = make_actor();
        let mut editor = connect(&mut actor);

        editor.send(Message::Text(r#"{"id":"1","type":5,"data":{"type":0}}"#.into())).unwrap();
        editor.send(Message::Text(r#"{"id":"2","type":5,"data":{"type":1}}"#.into())).unwrap();
        editor.close(None).unwrap();

        let inbox = read_until_disconnect(&actor);
        let ids: Vec<&str> = inbox
            .iter()
            .filter_map(|msg| match msg {
                WsMsg::Incoming { client: 1, text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids[0].contains(r#""id":"1""#));
        assert!(ids[1].contains(r#""id":"2""#));
        assert!(matches!(inbox.last(), Some(WsMsg::Disconnected { client: 1 })));
    }

    #[test]
    fn test_broadcast_without_clients_is_noop() {
        let (_temp, mut actor) = make_actor();
        actor.broadcast(&Envelope::reload("index.html"));
        assert!(actor.sessions.is_empty());
    }
}
