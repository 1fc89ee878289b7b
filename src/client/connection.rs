//! Connection state machine.
//!
//! ```text
//! Disconnected --connect--> Connecting --established--> Connected
//!      ^                        |                           |
//!      |                     failed                   closed(unclean)
//!      |                        v                           |
//!      +----closed(clean)-- Reconnecting{at} <--------------+
//! ```
//!
//! A clean close ends the connection for good. Failed attempts and unclean
//! closes go to `Reconnecting` at the instant the policy picks.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Server-initiated close handshake
    Clean,
    /// Network failure or reset without a close frame
    Unclean,
}

/// When to try again after a connection was lost.
pub trait ReconnectPolicy {
    /// `None` gives up and leaves the connection disconnected.
    fn next_attempt(&mut self, now: Instant) -> Option<Instant>;

    /// Called once a connection is established.
    fn reset(&mut self) {}
}

/// Same delay before every attempt, no retry cap.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl ReconnectPolicy for FixedDelay {
    fn next_attempt(&mut self, now: Instant) -> Option<Instant> {
        Some(now + self.0)
    }
}

#[derive(Debug)]
pub struct Connection<P = FixedDelay> {
    state: ConnectionState,
    policy: P,
}

impl<P: ReconnectPolicy> Connection<P> {
    pub fn new(policy: P) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Start an attempt. Returns `false` if one is running or established.
    pub fn connect(&mut self) -> bool {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Reconnecting { .. } => {
                self.state = ConnectionState::Connecting;
                true
            }
            ConnectionState::Connecting | ConnectionState::Connected => false,
        }
    }

    pub fn established(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
            self.policy.reset();
        }
    }

    /// The running attempt failed.
    pub fn failed(&mut self, now: Instant) -> ConnectionState {
        if self.state == ConnectionState::Connecting {
            self.state = self.retry_state(now);
        }
        self.state
    }

    /// The established connection closed. Returns `true` when this ends the
    /// client (clean close).
    pub fn closed(&mut self, kind: CloseKind, now: Instant) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        match kind {
            CloseKind::Clean => {
                self.state = ConnectionState::Disconnected;
                true
            }
            CloseKind::Unclean => {
                self.state = self.retry_state(now);
                false
            }
        }
    }

    /// Is a scheduled reconnection attempt due?
    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.state, ConnectionState::Reconnecting { at } if now >= at)
    }

    fn retry_state(&mut self, now: Instant) -> ConnectionState {
        match self.policy.next_attempt(now) {
            Some(at) => ConnectionState::Reconnecting { at },
            None => ConnectionState::Disconnected,
        }
    }
}
