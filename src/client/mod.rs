//! Editor client: the Connection Session and its WebSocket driver.
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── session.rs     # request correlation, push dispatch (no I/O)
//! ├── echo.rs        # SkipSet
//! ├── lifecycle.rs   # "start" / "end" phases
//! ├── connection.rs  # connection state machine, reconnect policy
//! ├── driver.rs      # tungstenite-backed EditorClient
//! └── error.rs
//! ```

mod connection;
mod driver;
mod echo;
mod error;
mod lifecycle;
mod session;

pub use connection::{CloseKind, Connection, ConnectionState, FixedDelay, ReconnectPolicy};
pub use driver::{ClientEvent, EditorClient};
pub use echo::SkipSet;
pub use error::{RequestError, TransportError};
pub use lifecycle::{Lifecycle, LifecycleEvent};
pub use session::{Action, PendingReply, Session, Transport};
