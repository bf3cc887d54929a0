//! Bayeux client error types.
//!
//! Only validation and local plumbing failures surface as errors. Protocol
//! failures reported by the server (`successful: false`) are not errors from
//! the caller's point of view: they are logged, retried or simply leave the
//! subscription registry untouched.

use thiserror::Error;

/// Bayeux client errors.
#[derive(Error, Debug)]
pub enum BayeuxError {
    /// Channel name does not follow the channel grammar.
    #[error("\"{0}\" is not a valid channel name")]
    InvalidChannel(String),

    /// Channel is reserved for protocol use and cannot be subscribed to.
    #[error("Clients may not subscribe to channel \"{0}\"")]
    NotSubscribable(String),

    /// Wildcard patterns and meta channels cannot receive published messages.
    #[error("Clients may not publish to channel \"{0}\"")]
    NotPublishable(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// The driver task has stopped and no longer accepts commands.
    #[error("Client driver has shut down")]
    DriverClosed,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Bayeux operations
pub type Result<T> = std::result::Result<T, BayeuxError>;

impl From<toml::de::Error> for BayeuxError {
    fn from(err: toml::de::Error) -> Self {
        BayeuxError::Config(err.to_string())
    }
}

impl BayeuxError {
    /// Whether the error came from channel name validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidChannel(_) | Self::NotSubscribable(_) | Self::NotPublishable(_)
        )
    }
}
