//! Bayeux wire protocol: envelopes, advice and channels.
//!
//! # Message Flow
//!
//! ```text
//! Client                                   Server
//!    |                                        |
//!    |---- /meta/handshake (conn types) ---->|  Negotiate session
//!    |<--- clientId, conn types, advice -----|
//!    |                                        |
//!    |---- /meta/connect (clientId) -------->|  Long-lived poll, held open
//!    |<--- pushed messages + connect reply --|  until data or timeout
//!    |---- /meta/connect ------------------->|  ...re-issued after advice.interval
//!    |                                        |
//!    |---- /meta/subscribe [channels] ------>|
//!    |<--- successful, subscription ---------|
//!    |                                        |
//!    |---- [publish, publish, ...] --------->|  Batched application messages
//!    |                                        |
//!    |---- /meta/disconnect ---------------->|  Fire-and-forget
//! ```
//!
//! ## Advice
//!
//! | `reconnect` | Client behavior                                    |
//! |-------------|----------------------------------------------------|
//! | `retry`     | Re-issue connect after `interval` milliseconds     |
//! | `handshake` | Drop the clientId and negotiate a new session      |
//! | `none`      | Stop all handshake/connect attempts                |

mod advice;
pub mod channel;
mod message;

pub use advice::{Advice, AdviceUpdate, Reconnect};
pub use channel::ChannelTree;
pub use message::{Message, Subscription};

/// Bayeux protocol version
pub const BAYEUX_VERSION: &str = "1.0";
