//! # Bayeux Core - publish/subscribe client state machine
//!
//! Client side of the Bayeux protocol: session negotiation, the long-poll
//! connect loop, advice-driven reconnection, subscription bookkeeping and
//! batched publishing, over any transport.
//!
//! ## Features
//!
//! - **Transport agnostic**: the client only builds envelopes; a [`Transport`]
//!   moves them and hands responses back
//! - **Single in-flight handshake/connect**: concurrent callers share one
//!   negotiation and one outstanding connect
//! - **Advice driven**: `retry`, `handshake` and `none` advice steer reconnection
//! - **Stale response filtering**: replies for an older clientId are discarded
//! - **Publish batching**: publishes inside a short window share one round trip
//! - **Deterministic**: retries and timeouts are timer events, so the whole
//!   state machine runs without a clock in tests
//!
//! ## Protocol Overview
//!
//! ```text
//! Application            Client                         Server
//!     |                     |                              |
//!     |-- subscribe ------->|-- /meta/handshake ---------->|
//!     |                     |<- clientId, advice ----------|
//!     |                     |-- /meta/connect ------------>|  (held open)
//!     |                     |-- /meta/subscribe ---------->|
//!     |                     |<- successful ----------------|
//!     |-- publish x3 ------>|                              |
//!     |                     |-- [msg, msg, msg] ---------->|  (one batch)
//!     |                     |<- pushed messages, connect --|
//!     |<-- listener(data) --|-- /meta/connect ------------>|  (after interval)
//!     |-- disconnect ------>|-- /meta/disconnect --------->|
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bayeux::{ClientConfig, Driver, Listener};
//! use serde_json::json;
//!
//! let (driver, handle) = Driver::new(transport, ClientConfig::new("http://localhost:8000/bayeux"));
//! tokio::spawn(driver.run());
//!
//! handle.subscribe("/chat/*", Listener::new(|data| println!("got {data}")))?;
//! handle.publish("/chat/lobby", json!({"text": "hello"}))?;
//! ```
//!
//! ## Modules
//!
//! - [`client`]: Session state machine, callback gate, listeners
//! - [`protocol`]: Envelopes, advice, channel grammar and subscription registry
//! - [`transport`]: Transport trait and connection type negotiation
//! - [`timer`]: Named one-shot timers
//! - [`driver`]: Tokio event loop owning a client
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod id;
pub mod protocol;
pub mod timer;
pub mod transport;

// Re-exports for convenience
pub use client::{Callback, Channels, Client, ConnectionState, Exchange, Listener};
pub use config::ClientConfig;
pub use driver::{ClientHandle, Command, Driver, Inbound, Responder};
pub use error::{BayeuxError, Result};
pub use id::{IdGenerator, SequenceGenerator, UuidGenerator};
pub use protocol::{Advice, AdviceUpdate, ChannelTree, Message, Reconnect, BAYEUX_VERSION};
pub use timer::{TimerEvent, TimerName, TimerRegistry, Timers};
pub use transport::Transport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
