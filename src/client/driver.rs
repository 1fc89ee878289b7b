//! Blocking WebSocket driver for the Connection Session.
//!
//! The socket is read with a short timeout, so a pending request is awaited
//! by pumping frames until its resolver fires. RELOAD pushes that arrive
//! meanwhile are queued and handed out by [`EditorClient::poll`].

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;

use super::connection::{CloseKind, Connection, ConnectionState, FixedDelay};
use super::error::{RequestError, TransportError};
use super::lifecycle::{Lifecycle, LifecycleEvent};
use super::session::{Action, PendingReply, Session, Transport};
use crate::config::SyncConfig;
use crate::protocol::{
    Envelope, MessageKind, MessagePayload, ProtocolError, TreeKind, TreeListing, TreeRequest,
};
use crate::utils::path::route::normalize_url;

/// Read timeout of the socket, i.e. the granularity of `poll`
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    socket: Socket,
}

impl Transport for WsTransport {
    fn is_ready(&self) -> bool {
        self.socket.can_write()
    }

    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket.send(Message::Text(text.into()))?;
        Ok(())
    }
}

/// Something the owner of an [`EditorClient`] should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Idle,
    /// A change this client did not cause
    Reload(String),
    /// Connection lost, next attempt scheduled
    Reconnecting { at: Instant },
    Reconnected,
    /// Clean close; the client is done
    Ended,
}

pub struct EditorClient {
    url: String,
    /// Location announced with INIT, relative to the project root
    location: String,
    timeout: Duration,
    session: Option<Session<WsTransport>>,
    connection: Connection<FixedDelay>,
    lifecycle: Lifecycle,
    deferred: VecDeque<ClientEvent>,
}

impl EditorClient {
    pub fn new(config: &SyncConfig, location: &str) -> Self {
        let mut location = normalize_url(location);
        if location.is_empty() {
            location = config.project.index.clone();
        }

        Self {
            url: config.client.url.clone(),
            location,
            timeout: config.client.request_timeout(),
            session: None,
            connection: Connection::new(FixedDelay(config.client.reconnect_delay())),
            lifecycle: Lifecycle::default(),
            deferred: VecDeque::new(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn on(&mut self, event: LifecycleEvent, listener: impl FnOnce() + Send + 'static) {
        self.lifecycle.on(event, listener);
    }

    /// Connect and announce the location. A failed attempt schedules the
    /// next one; see [`EditorClient::poll`].
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if !self.connection.connect() {
            return Ok(());
        }

        match self.open() {
            Ok(session) => {
                self.session = Some(session);
                self.connection.established();
                crate::log!("client"; "connected to {} as {}", self.url, self.location);
                self.lifecycle.fire(LifecycleEvent::Start);
                Ok(())
            }
            Err(e) => {
                self.connection.failed(Instant::now());
                Err(e)
            }
        }
    }

    fn open(&self) -> Result<Session<WsTransport>, TransportError> {
        let (mut socket, _response) = tungstenite::connect(self.url.as_str())?;
        if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
            stream.set_read_timeout(Some(POLL_TIMEOUT))?;
        }

        let mut session = Session::new(WsTransport { socket }, self.timeout);
        session
            .notify(&Envelope::init(self.location.as_str()))
            .map_err(|e| match e {
                RequestError::Transport(e) => e,
                _ => TransportError::Disconnected,
            })?;
        Ok(session)
    }

    /// Send a request and wait for its response.
    pub fn request(&mut self, kind: MessageKind, data: Value) -> Result<Value, RequestError> {
        let session = self
            .session
            .as_mut()
            .ok_or(RequestError::Protocol(ProtocolError::NotReady))?;
        let reply = session.send_request(kind, data)?;
        self.await_reply(reply)
    }

    /// Key listing of a tree.
    pub fn tree(&mut self, kind: TreeKind) -> Result<Vec<String>, RequestError> {
        let data = serde_json::to_value(TreeRequest { kind: kind.code() }).unwrap_or(Value::Null);
        let value = self.request(MessageKind::Tree, data)?;
        Ok(decode::<TreeListing>(value)?.tree)
    }

    /// Save `content` to the bound document. Its echo RELOAD is suppressed.
    pub fn save(&mut self, content: &str) -> Result<String, RequestError> {
        let location = self.location.clone();
        let session = self
            .session
            .as_mut()
            .ok_or(RequestError::Protocol(ProtocolError::NotReady))?;
        let reply = session.write(&location, content)?;
        let value = self.await_reply(reply)?;
        Ok(decode::<MessagePayload>(value)?.message)
    }

    fn await_reply(&mut self, mut reply: PendingReply) -> Result<Value, RequestError> {
        loop {
            if let Some(outcome) = reply.try_take() {
                return outcome;
            }
            match self.pump() {
                ClientEvent::Idle => {}
                event => self.deferred.push_back(event),
            }
            if let Some(session) = self.session.as_mut() {
                session.expire_pending(Instant::now());
            }
        }
    }

    /// Drive the client one step: hand out queued events, reconnect when
    /// due, otherwise read at most one frame.
    pub fn poll(&mut self) -> ClientEvent {
        if let Some(event) = self.deferred.pop_front() {
            return event;
        }

        let now = Instant::now();
        match self.connection.state() {
            ConnectionState::Disconnected => return ClientEvent::Ended,
            ConnectionState::Reconnecting { at } if now < at => {
                std::thread::sleep((at - now).min(POLL_TIMEOUT));
                return ClientEvent::Idle;
            }
            ConnectionState::Reconnecting { .. } => {
                return match self.connect() {
                    Ok(()) => ClientEvent::Reconnected,
                    Err(e) => {
                        crate::log!("client"; "reconnect failed: {}", e);
                        self.retry_event()
                    }
                };
            }
            ConnectionState::Connecting | ConnectionState::Connected => {}
        }

        let event = self.pump();
        if let Some(session) = self.session.as_mut() {
            session.expire_pending(now);
        }
        event
    }

    /// Client-initiated close.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            let socket = &mut session.transport_mut().socket;
            let _ = socket.close(None);
            let _ = socket.flush();
        }
        if self.connection.closed(CloseKind::Clean, Instant::now()) {
            self.lifecycle.fire(LifecycleEvent::End);
        }
    }

    /// Read at most one frame.
    fn pump(&mut self) -> ClientEvent {
        let Some(session) = self.session.as_mut() else {
            return ClientEvent::Idle;
        };

        match session.transport_mut().socket.read() {
            Ok(Message::Text(text)) => match session.handle_incoming(text.as_str()) {
                Ok(Action::Reload(path)) => ClientEvent::Reload(path),
                Ok(Action::None) => ClientEvent::Idle,
                Err(e) => {
                    crate::log!("client"; "{}", e);
                    ClientEvent::Idle
                }
            },
            Ok(Message::Close(_)) | Err(tungstenite::Error::ConnectionClosed) => {
                self.on_closed(CloseKind::Clean)
            }
            Ok(_) => ClientEvent::Idle,
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                ClientEvent::Idle
            }
            Err(e) => {
                crate::debug!("client"; "read error: {}", e);
                self.on_closed(CloseKind::Unclean)
            }
        }
    }

    fn on_closed(&mut self, kind: CloseKind) -> ClientEvent {
        if let Some(mut session) = self.session.take() {
            session.close();
            // Send the queued close reply
            let _ = session.transport_mut().socket.flush();
        }

        if self.connection.closed(kind, Instant::now()) {
            crate::log!("client"; "server closed the connection");
            self.lifecycle.fire(LifecycleEvent::End);
            return ClientEvent::Ended;
        }
        crate::log!("client"; "connection lost");
        self.retry_event()
    }

    fn retry_event(&self) -> ClientEvent {
        match self.connection.state() {
            ConnectionState::Reconnecting { at } => ClientEvent::Reconnecting { at },
            _ => ClientEvent::Ended,
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, RequestError> {
    serde_json::from_value(value).map_err(|source| {
        RequestError::Protocol(ProtocolError::Payload {
            kind: MessageKind::Ack,
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::JoinHandle;

    /// Accept one editor and wait for its INIT. Then either close the
    /// connection with a close frame, or drop the socket without one.
    fn serve_once(clean: bool) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            assert!(ws.read().unwrap().is_text());
            if clean {
                ws.close(None).unwrap();
                // Until the close reply or EOF
                while ws.read().is_ok() {}
            }
        });
        (url, server)
    }

    fn connected_client(url: String) -> (EditorClient, Arc<AtomicBool>) {
        let mut config = SyncConfig::default();
        config.client.url = url;
        let mut client = EditorClient::new(&config, "index.html");

        let ended = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ended);
        client.on(LifecycleEvent::End, move || flag.store(true, Ordering::SeqCst));

        client.connect().unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        (client, ended)
    }

    fn next_event(client: &mut EditorClient) -> ClientEvent {
        for _ in 0..100 {
            match client.poll() {
                ClientEvent::Idle => {}
                event => return event,
            }
        }
        panic!("no event within the polling window");
    }

    #[test]
    fn test_location_is_normalized() {
        let config = SyncConfig::default();
        assert_eq!(EditorClient::new(&config, "/pages/a.html?x=1").location(), "pages/a.html");
        assert_eq!(EditorClient::new(&config, "").location(), "index.html");
        assert_eq!(EditorClient::new(&config, "/").location(), "index.html");
    }

    #[test]
    fn test_request_before_connect_is_not_ready() {
        let config = SyncConfig::default();
        let mut client = EditorClient::new(&config, "index.html");
        assert_eq!(client.state(), ConnectionState::Disconnected);

        let err = client.tree(TreeKind::Project).unwrap_err();
        assert!(matches!(err, RequestError::Protocol(ProtocolError::NotReady)));
        assert!(matches!(
            client.save("x"),
            Err(RequestError::Protocol(ProtocolError::NotReady))
        ));
    }

    #[test]
    fn test_poll_when_disconnected_ends() {
        let config = SyncConfig::default();
        let mut client = EditorClient::new(&config, "index.html");
        assert_eq!(client.poll(), ClientEvent::Ended);
    }

    #[test]
    fn test_close_frame_ends_cleanly() {
        let (url, server) = serve_once(true);
        let (mut client, ended) = connected_client(url);

        assert_eq!(next_event(&mut client), ClientEvent::Ended);
        assert!(ended.load(Ordering::SeqCst));
        assert_eq!(client.state(), ConnectionState::Disconnected);

        drop(client);
        server.join().unwrap();
    }

    #[test]
    fn test_lost_connection_schedules_reconnect() {
        let (url, server) = serve_once(false);
        let (mut client, ended) = connected_client(url);
        server.join().unwrap();

        let before = Instant::now();
        let event = next_event(&mut client);
        let ClientEvent::Reconnecting { at } = event else {
            panic!("expected a reconnect, got {:?}", event);
        };

        let delay = Duration::from_millis(500);
        assert!(at >= before + delay);
        assert!(at <= Instant::now() + delay);
        assert_eq!(client.state(), ConnectionState::Reconnecting { at });
        assert!(!ended.load(Ordering::SeqCst));
    }
}
