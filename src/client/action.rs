//! Listeners, callbacks and the deferred work the client carries around.
//!
//! Everything the client must remember across a suspension point (a pending
//! transport exchange, a timer, a queued caller) is stored as data rather than
//! as a closure over the client, so the client stays a plain `&mut self`
//! state machine.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::protocol::channel;

/// One-shot notification, e.g. "connected" or "unsubscribed"
pub type Callback = Box<dyn FnOnce() + Send>;

/// Subscriber invoked with the `data` of every matching message
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&Value) + Send + Sync>);

impl Listener {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Call the subscriber with a message payload
    pub fn invoke(&self, data: &Value) {
        (self.0)(data);
    }

    /// Whether both handles wrap the same closure
    pub fn same_as(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener")
    }
}

/// One or more channel names, in caller order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Channels(Vec<String>);

impl Channels {
    /// Names as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Take the names
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Channels {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for Channels {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for Channels {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for Channels {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Channels {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Channels {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| (*s).to_string()).collect())
    }
}

/// Work to run once the session is connected
pub(crate) enum Step {
    /// Re-enter `connect`, then run the inner step
    Connect(Option<Box<Step>>),
    /// Send `/meta/subscribe`
    Subscribe {
        channels: Vec<String>,
        listener: Option<Listener>,
    },
    /// Send `/meta/unsubscribe`
    Unsubscribe {
        channels: Vec<String>,
        callback: Option<Callback>,
    },
    /// Queue a message in the outbox
    Publish { channel: String, data: Value },
    /// Notify the application
    Notify(Callback),
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Publish { .. } => "publish",
            Self::Notify(_) => "notify",
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bookkeeping for a request awaiting its response
pub(crate) enum Pending {
    Handshake { attempt: u64, then: Option<Step> },
    Connect { id: String },
    Subscribe {
        channels: Vec<String>,
        listener: Option<Listener>,
    },
    Unsubscribe {
        channels: Vec<String>,
        callback: Option<Callback>,
    },
    Publish { count: usize },
}

/// Token handed to the transport with every request that expects a reply.
///
/// The transport returns it, untouched, with the server's response(s) via
/// `Client::receive`.
pub struct Exchange(pub(crate) Pending);

impl Exchange {
    /// Short name of the request kind
    pub fn kind(&self) -> &'static str {
        match &self.0 {
            Pending::Handshake { .. } => "handshake",
            Pending::Connect { .. } => "connect",
            Pending::Subscribe { .. } => "subscribe",
            Pending::Unsubscribe { .. } => "unsubscribe",
            Pending::Publish { .. } => "publish",
        }
    }

    /// Meta channel the reply arrives on; `None` for publish batches
    pub fn meta_channel(&self) -> Option<&'static str> {
        match &self.0 {
            Pending::Handshake { .. } => Some(channel::HANDSHAKE),
            Pending::Connect { .. } => Some(channel::CONNECT),
            Pending::Subscribe { .. } => Some(channel::SUBSCRIBE),
            Pending::Unsubscribe { .. } => Some(channel::UNSUBSCRIBE),
            Pending::Publish { .. } => None,
        }
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Exchange").field(&self.kind()).finish()
    }
}
