//! Bayeux client session management.
//!
//! # State Machine
//!
//! ```text
//!                 handshake()
//!   [Unconnected] ───────────> [Connecting]
//!        ▲   ▲                    │      │
//!        │   │  unsuccessful /    │      │ successful
//!        │   └──── retry after ───┘      │ (clientId assigned)
//!        │         interval              v
//!        │                          [Connected] ──┐
//!        │  liveness timeout /          │         │ connect() loop
//!        └── handshake advice ──────────┤ <───────┘
//!                                       │ disconnect()
//!                                       v
//!                                [Disconnected]  (terminal)
//! ```
//!
//! | State          | Description                              |
//! |----------------|------------------------------------------|
//! | `Unconnected`  | No session; next connect handshakes      |
//! | `Connecting`   | Handshake in flight; callers are queued  |
//! | `Connected`    | Session live; connect loop running       |
//! | `Disconnected` | Session ended by the application         |
//!
//! # Usage
//!
//! ```rust,ignore
//! use bayeux::{Client, ClientConfig, Listener};
//!
//! let mut client = Client::new(transport, ClientConfig::new("http://localhost:8000/bayeux"));
//! client.subscribe("/chat/*", Listener::new(|data| println!("{data}")))?;
//! client.publish("/chat/lobby", serde_json::json!({"text": "hi"}))?;
//!
//! // Later, from the transport and the timer loop:
//! client.receive(exchange, responses);
//! client.fire(event);
//! ```

mod action;
mod deferred;
mod session;

pub use action::{Callback, Channels, Exchange, Listener};
pub use deferred::{CallbackGate, DeferredStatus};
pub use session::Client;

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, nothing in flight
    Unconnected,
    /// Handshake sent, waiting for the reply
    Connecting,
    /// Session established
    Connected,
    /// Session ended; terminal
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}
