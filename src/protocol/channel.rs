//! Channel names, validation and the subscription registry.
//!
//! Channels are `/`-delimited paths such as `/chat/room-1`. A subscription
//! may end in a wildcard segment: `*` matches exactly one further segment,
//! `**` matches one or more. Channels under `/meta/` are reserved for the
//! protocol itself.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{BayeuxError, Result};

/// Handshake meta channel
pub const HANDSHAKE: &str = "/meta/handshake";
/// Connect meta channel
pub const CONNECT: &str = "/meta/connect";
/// Disconnect meta channel
pub const DISCONNECT: &str = "/meta/disconnect";
/// Subscribe meta channel
pub const SUBSCRIBE: &str = "/meta/subscribe";
/// Unsubscribe meta channel
pub const UNSUBSCRIBE: &str = "/meta/unsubscribe";

/// Prefix of every reserved protocol channel
pub const META_PREFIX: &str = "/meta/";

lazy_static! {
    static ref CHANNEL_NAME: Regex =
        Regex::new(r"^(/[A-Za-z0-9\-_!~()$@]+)+$").expect("channel name grammar");
    static ref CHANNEL_PATTERN: Regex =
        Regex::new(r"^(/[A-Za-z0-9\-_!~()$@]+)*/\*{1,2}$").expect("channel pattern grammar");
}

/// Whether `name` is a concrete channel or a wildcard pattern
pub fn is_valid(name: &str) -> bool {
    CHANNEL_NAME.is_match(name) || CHANNEL_PATTERN.is_match(name)
}

/// Whether `name` ends in a `*` or `**` wildcard segment
pub fn is_pattern(name: &str) -> bool {
    CHANNEL_PATTERN.is_match(name)
}

/// Whether `name` is a reserved protocol channel
pub fn is_meta(name: &str) -> bool {
    name.starts_with(META_PREFIX)
}

/// Whether applications may subscribe to `name`
pub fn is_subscribable(name: &str) -> bool {
    is_valid(name) && !is_meta(name)
}

/// Check every channel for subscribe/unsubscribe, failing on the first bad one.
pub fn validate_subscribable<S: AsRef<str>>(channels: &[S]) -> Result<()> {
    for channel in channels {
        let channel = channel.as_ref();
        if !is_valid(channel) {
            return Err(BayeuxError::InvalidChannel(channel.to_string()));
        }
        if is_meta(channel) {
            return Err(BayeuxError::NotSubscribable(channel.to_string()));
        }
    }
    Ok(())
}

/// Check a channel for publishing: concrete, valid and not reserved.
pub fn validate_publishable(channel: &str) -> Result<()> {
    validate_subscribable(&[channel])?;
    if is_pattern(channel) {
        return Err(BayeuxError::NotPublishable(channel.to_string()));
    }
    Ok(())
}

/// Every pattern that matches the concrete channel `name`.
///
/// For `/a/b/c` this is `/**`, `/a/b/c`, `/a/b/*`, `/a/**` and `/a/b/**`.
pub fn expand(name: &str) -> Vec<String> {
    let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
    let mut patterns = vec!["/**".to_string(), name.to_string()];

    if let Some((_, parents)) = segments.split_last() {
        patterns.push(unparse(parents, "*"));
        for depth in 1..segments.len() {
            patterns.push(unparse(&segments[..depth], "**"));
        }
    }
    patterns
}

fn unparse(parents: &[&str], last: &str) -> String {
    let mut name = String::new();
    for segment in parents {
        name.push('/');
        name.push_str(segment);
    }
    name.push('/');
    name.push_str(last);
    name
}

/// Subscription registry: one entry per channel pattern.
///
/// Registering a pattern twice replaces the earlier entry.
#[derive(Debug, Clone)]
pub struct ChannelTree<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for ChannelTree<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Clone> ChannelTree<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry` under `pattern`, returning the entry it replaced
    pub fn register(&mut self, pattern: &str, entry: T) -> Option<T> {
        self.entries.insert(pattern.to_string(), entry)
    }

    /// Remove the entry stored under `pattern`
    pub fn unregister(&mut self, pattern: &str) -> Option<T> {
        self.entries.remove(pattern)
    }

    /// Entries of every registered pattern matching the concrete channel
    pub fn matching(&self, channel: &str) -> Vec<T> {
        expand(channel)
            .iter()
            .filter_map(|pattern| self.entries.get(pattern).cloned())
            .collect()
    }

    /// Registered pattern names, in sorted order
    pub fn patterns(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whether `pattern` has an entry
    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.contains_key(pattern)
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
