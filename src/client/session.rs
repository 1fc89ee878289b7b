//! Connection Session: request correlation and push dispatch.
//!
//! The session does no I/O of its own. Outgoing frames go through a
//! [`Transport`]; incoming frames are fed to [`Session::handle_incoming`]
//! by whoever owns the socket. One session lives for one connection
//! attempt; reconnecting builds a new one, which drops every resolver and
//! every skip mark of the old connection.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use super::echo::SkipSet;
use super::error::{RequestError, TransportError};
use crate::protocol::{
    Envelope, MessageKind, MessagePayload, PathPayload, ProtocolError, WritePayload, generate_id,
};

/// Outgoing half of a connection
pub trait Transport {
    /// Can a frame be sent right now?
    fn is_ready(&self) -> bool;

    fn send_text(&mut self, text: String) -> Result<(), TransportError>;
}

/// What the owner of the session should do after an incoming frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    /// Full reload of the editing surface
    Reload(String),
}

type Outcome = Result<Value, RequestError>;

struct Pending {
    resolver: oneshot::Sender<Outcome>,
    deadline: Instant,
}

/// Handle to an outstanding request
#[derive(Debug)]
pub struct PendingReply {
    id: String,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingReply {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Non-blocking check. `None` while the response is outstanding.
    pub fn try_take(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RequestError::Closed)),
        }
    }

    /// Suspend until the response arrives.
    pub async fn wait(self) -> Outcome {
        self.rx.await.unwrap_or(Err(RequestError::Closed))
    }
}

pub struct Session<T: Transport> {
    transport: T,
    pending: FxHashMap<String, Pending>,
    skip: SkipSet,
    timeout: Duration,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            pending: FxHashMap::default(),
            skip: SkipSet::default(),
            timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn skip_set(&self) -> &SkipSet {
        &self.skip
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send a request and register its resolver.
    ///
    /// Fails with [`ProtocolError::NotReady`] when the transport cannot
    /// send; nothing is retried.
    pub fn send_request(
        &mut self,
        kind: MessageKind,
        data: Value,
    ) -> Result<PendingReply, RequestError> {
        self.send_request_at(kind, data, Instant::now())
    }

    fn send_request_at(
        &mut self,
        kind: MessageKind,
        data: Value,
        now: Instant,
    ) -> Result<PendingReply, RequestError> {
        if !self.transport.is_ready() {
            return Err(ProtocolError::NotReady.into());
        }

        let id = generate_id();
        let envelope = Envelope::new(id.clone(), kind, data);
        self.transport.send_text(envelope.to_json())?;

        let (resolver, rx) = oneshot::channel();
        self.pending.insert(
            id.clone(),
            Pending {
                resolver,
                deadline: now + self.timeout,
            },
        );
        crate::debug!("client"; "{} request {}", kind.label(), id);
        Ok(PendingReply { id, rx })
    }

    /// Send a push that expects no response (INIT).
    pub fn notify(&mut self, envelope: &Envelope) -> Result<(), RequestError> {
        if !self.transport.is_ready() {
            return Err(ProtocolError::NotReady.into());
        }
        self.transport.send_text(envelope.to_json())?;
        Ok(())
    }

    /// WRITE `content` for `path`, marking the path so its echo is dropped.
    pub fn write(&mut self, path: &str, content: &str) -> Result<PendingReply, RequestError> {
        self.skip.mark(path);
        let data = serde_json::to_value(WritePayload {
            content: content.to_string(),
        })
        .unwrap_or(Value::Null);

        let result = self.send_request(MessageKind::Write, data);
        if result.is_err() {
            // Never sent, so no echo will come
            self.skip.consume(path);
        }
        result
    }

    /// Dispatch one raw incoming frame.
    ///
    /// Malformed frames and unknown kinds are logged and dropped. A
    /// response for an id that is not outstanding is an error.
    pub fn handle_incoming(&mut self, raw: &str) -> Result<Action, ProtocolError> {
        let envelope = match Envelope::from_json(raw) {
            Ok(envelope) => envelope,
            Err(e @ (ProtocolError::Malformed(_) | ProtocolError::UnknownKind(_))) => {
                crate::log!("client"; "dropped message: {}", e);
                return Ok(Action::None);
            }
            Err(e) => return Err(e),
        };

        match envelope.kind {
            MessageKind::Ack | MessageKind::Fail => {
                let pending = self
                    .pending
                    .remove(&envelope.id)
                    .ok_or_else(|| ProtocolError::UnknownId(envelope.id.clone()))?;

                let outcome = if envelope.kind == MessageKind::Ack {
                    Ok(envelope.data)
                } else {
                    Err(RequestError::Failed(fail_message(&envelope)))
                };
                // Receiver may already be gone; nothing to resolve then
                let _ = pending.resolver.send(outcome);
                Ok(Action::None)
            }

            MessageKind::Reload => {
                let path = envelope.payload::<PathPayload>()?.path;
                if self.skip.consume(&path) {
                    crate::debug!("client"; "suppressed own change: {}", path);
                    Ok(Action::None)
                } else {
                    Ok(Action::Reload(path))
                }
            }

            MessageKind::Init | MessageKind::Write | MessageKind::Tree => {
                crate::log!("client"; "ignoring {} from server", envelope.kind.label());
                Ok(Action::None)
            }
        }
    }

    /// Reject every request whose deadline has passed. Returns how many.
    pub fn expire_pending(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(pending) = self.pending.remove(id) {
                crate::debug!("client"; "request {} timed out", id);
                let _ = pending.resolver.send(Err(RequestError::Timeout));
            }
        }
        expired.len()
    }

    /// Reject every outstanding request; the connection is gone.
    pub fn close(&mut self) {
        for (_, pending) in self.pending.drain() {
            let _ = pending.resolver.send(Err(RequestError::Closed));
        }
    }
}

fn fail_message(envelope: &Envelope) -> String {
    envelope
        .payload::<MessagePayload>()
        .map(|payload| payload.message)
        .unwrap_or_else(|_| envelope.data.to_string())
}
