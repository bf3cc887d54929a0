//! Server reconnection advice.
//!
//! The server steers how the client reconnects: keep polling (`retry`),
//! negotiate a fresh session (`handshake`), or stop entirely (`none`).
//! Every response may carry a partial advice object which is merged field by
//! field into the session's current advice.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reconnect {
    /// Reconnect with the current session after `interval`
    Retry,
    /// Discard the session and handshake again
    Handshake,
    /// Do not attempt to reconnect
    None,
}

/// Advice as received on the wire; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceUpdate {
    /// Reconnect policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<Reconnect>,
    /// Delay before the next connect or handshake, in milliseconds
    #[serde(
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<u64>,
}

/// Servers send intervals as any JSON number; fractions round, negatives clamp to 0.
#[allow(clippy::cast_sign_loss)]
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = Option::<f64>::deserialize(deserializer)?;
    Ok(millis.map(|ms| if ms.is_finite() && ms > 0.0 { ms.round() as u64 } else { 0 }))
}

impl AdviceUpdate {
    /// Advice carrying only a reconnect policy
    pub fn reconnect(reconnect: Reconnect) -> Self {
        Self {
            reconnect: Some(reconnect),
            interval: None,
        }
    }
}

/// Session advice currently in force
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advice {
    /// Reconnect policy
    pub reconnect: Reconnect,
    /// Delay before reconnecting
    pub interval: Duration,
}

impl Advice {
    /// Initial advice: retry after the given interval
    pub fn retry(interval: Duration) -> Self {
        Self {
            reconnect: Reconnect::Retry,
            interval,
        }
    }

    /// Shallow-merge a server update; absent fields keep their value
    pub fn merge(&mut self, update: &AdviceUpdate) {
        if let Some(reconnect) = update.reconnect {
            self.reconnect = reconnect;
        }
        if let Some(interval) = update.interval {
            self.interval = Duration::from_millis(interval);
        }
    }

    /// Whether any further handshake or connect may be attempted
    pub fn allows_reconnect(&self) -> bool {
        self.reconnect != Reconnect::None
    }
}
