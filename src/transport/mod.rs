//! Transport abstraction for the Bayeux client.
//!
//! The client builds envelopes; a [`Transport`] moves them. Implementations
//! decide how (HTTP long-polling, websocket, in-process) and report the
//! server's answer by calling `Client::receive` with the [`Exchange`] token
//! they were handed. A failed delivery is reported the same way, as an
//! unsuccessful response built with `Message::failure`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             Protocol Client             │
//! │        (state machine, no I/O)          │
//! └──────────────────┬──────────────────────┘
//!        send(msgs, exchange) │ ▲ receive(exchange, responses)
//!                    ▼        │
//! ┌─────────────────────────────────────────┐
//! │               Transport                 │
//! │   (long-polling, websocket, in-memory)  │
//! └─────────────────────────────────────────┘
//! ```

use crate::client::Exchange;
use crate::protocol::Message;

/// Connection type used for long-polling HTTP transports
pub const LONG_POLLING: &str = "long-polling";

/// Connection type used for JSONP-style transports
pub const CALLBACK_POLLING: &str = "callback-polling";

/// Connection type used for websocket transports
pub const WEBSOCKET: &str = "websocket";

/// Transport trait for pluggable network backends.
pub trait Transport {
    /// Connection type currently in use, sent with every `/meta/connect`.
    fn connection_type(&self) -> &str;

    /// Connection types this transport can switch to, advertised in the handshake.
    fn supported_connection_types(&self) -> Vec<String>;

    /// Re-resolve the connection type after the server advertised its own list.
    fn select(&mut self, server_types: &[String]);

    /// Send one or more envelopes.
    ///
    /// With `Some(exchange)` the transport must eventually hand the response(s)
    /// back to the client; with `None` the request is fire-and-forget.
    fn send(&mut self, messages: Vec<Message>, exchange: Option<Exchange>);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connection_type(&self) -> &str {
        (**self).connection_type()
    }

    fn supported_connection_types(&self) -> Vec<String> {
        (**self).supported_connection_types()
    }

    fn select(&mut self, server_types: &[String]) {
        (**self).select(server_types);
    }

    fn send(&mut self, messages: Vec<Message>, exchange: Option<Exchange>) {
        (**self).send(messages, exchange);
    }
}

/// Pick the first local connection type the server also supports.
///
/// Local preference order wins, mirroring how the handshake advertises it.
pub fn negotiate(local: &[String], server: &[String]) -> Option<String> {
    local.iter().find(|t| server.contains(t)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_negotiate_prefers_local_order() {
        let local = types(&[WEBSOCKET, LONG_POLLING]);
        let server = types(&[LONG_POLLING, WEBSOCKET]);
        assert_eq!(negotiate(&local, &server).as_deref(), Some(WEBSOCKET));
    }

    #[test]
    fn test_negotiate_no_overlap() {
        let local = types(&[WEBSOCKET]);
        let server = types(&[CALLBACK_POLLING]);
        assert_eq!(negotiate(&local, &server), None);
    }
}
