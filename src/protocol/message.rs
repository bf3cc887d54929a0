//! Protocol messages for Bayeux communication.
//!
//! A single envelope type covers requests, responses and pushed messages;
//! which fields are present depends on the channel. Field names follow the
//! Bayeux wire contract exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::advice::AdviceUpdate;
use super::{channel, BAYEUX_VERSION};

/// Protocol message envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Channel the message is addressed to
    pub channel: String,
    /// Session identifier (absent on handshake requests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Protocol version (handshake)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Lowest protocol version accepted (handshake)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
    /// Connection types the sender supports (handshake)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,
    /// Connection type in use (connect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// Correlation id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel(s) to (un)subscribe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    /// Application payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Outcome of a request (responses only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    /// Error description when unsuccessful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server reconnection advice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<AdviceUpdate>,
    /// Extension data, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// The `subscription` field, which the wire allows as one name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subscription {
    /// A single channel name
    One(String),
    /// Several channel names, in request order
    Many(Vec<String>),
}

impl Subscription {
    /// Flatten into an ordered list of channel names
    pub fn channels(&self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name.clone()],
            Self::Many(names) => names.clone(),
        }
    }
}

impl From<Vec<String>> for Subscription {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl Message {
    /// Create a `/meta/handshake` request
    pub fn handshake(supported_connection_types: Vec<String>) -> Self {
        Self {
            channel: channel::HANDSHAKE.to_string(),
            version: Some(BAYEUX_VERSION.to_string()),
            supported_connection_types: Some(supported_connection_types),
            ..Default::default()
        }
    }

    /// Create a `/meta/connect` request
    pub fn connect(client_id: &str, connection_type: &str, id: &str) -> Self {
        Self {
            channel: channel::CONNECT.to_string(),
            client_id: Some(client_id.to_string()),
            connection_type: Some(connection_type.to_string()),
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    /// Create a `/meta/disconnect` request
    pub fn disconnect(client_id: &str) -> Self {
        Self {
            channel: channel::DISCONNECT.to_string(),
            client_id: Some(client_id.to_string()),
            ..Default::default()
        }
    }

    /// Create a `/meta/subscribe` request
    pub fn subscribe(client_id: &str, channels: Vec<String>) -> Self {
        Self {
            channel: channel::SUBSCRIBE.to_string(),
            client_id: Some(client_id.to_string()),
            subscription: Some(Subscription::Many(channels)),
            ..Default::default()
        }
    }

    /// Create a `/meta/unsubscribe` request
    pub fn unsubscribe(client_id: &str, channels: Vec<String>) -> Self {
        Self {
            channel: channel::UNSUBSCRIBE.to_string(),
            client_id: Some(client_id.to_string()),
            subscription: Some(Subscription::Many(channels)),
            ..Default::default()
        }
    }

    /// Create a publish envelope for an application channel
    pub fn publish(channel: &str, data: Value, client_id: &str) -> Self {
        Self {
            channel: channel.to_string(),
            data: Some(data),
            client_id: Some(client_id.to_string()),
            ..Default::default()
        }
    }

    /// Create an unsuccessful response, used by transports to report delivery errors
    pub fn failure(channel: &str, error: &str) -> Self {
        Self {
            channel: channel.to_string(),
            successful: Some(false),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Whether the server reported success
    pub fn is_successful(&self) -> bool {
        self.successful == Some(true)
    }

    /// Whether this message travels on a protocol meta channel
    pub fn is_meta(&self) -> bool {
        channel::is_meta(&self.channel)
    }

    /// Channels named in the `subscription` field
    pub fn subscription_channels(&self) -> Option<Vec<String>> {
        self.subscription.as_ref().map(Subscription::channels)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Deserialize a response body, which may hold one message or an array
    pub fn batch_from_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Body {
            Many(Vec<Message>),
            One(Box<Message>),
        }

        Ok(match serde_json::from_str(json)? {
            Body::Many(messages) => messages,
            Body::One(message) => vec![*message],
        })
    }
}
