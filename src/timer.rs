//! Named one-shot timers.
//!
//! The client never sleeps or spawns; it asks a [`Timers`] implementation to
//! hold a [`TimerEvent`] for some delay and expects the host to hand the event
//! back through `Client::fire` once the delay has elapsed. Each event has a
//! fixed [`TimerName`] and adding a timer replaces any pending timer of the
//! same name.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Timer slots used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerName {
    /// Liveness guard for an outstanding connect
    Reconnect,
    /// Outbox flush debounce
    Publish,
    /// Handshake retry after an unsuccessful attempt
    Handshake,
    /// Next connect poll of the long-poll cycle
    Connect,
}

impl TimerName {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reconnect => "reconnect",
            Self::Publish => "publish",
            Self::Handshake => "handshake",
            Self::Connect => "connect",
        }
    }
}

impl fmt::Display for TimerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What the client does when a timer expires
pub enum TimerEvent {
    /// The server did not answer a connect in time
    Reconnect,
    /// Flush the outbox
    Publish,
    /// Retry the handshake
    Handshake,
    /// Issue the next connect
    Connect,
}

impl TimerEvent {
    /// Slot this event occupies
    pub fn name(&self) -> TimerName {
        match self {
            Self::Reconnect => TimerName::Reconnect,
            Self::Publish => TimerName::Publish,
            Self::Handshake => TimerName::Handshake,
            Self::Connect => TimerName::Connect,
        }
    }
}

impl fmt::Debug for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimerEvent").field(&self.name()).finish()
    }
}

/// Timer registry contract consumed by the client
pub trait Timers {
    /// Schedule `event` after `delay`, replacing a pending timer of the same name.
    fn add(&mut self, delay: Duration, event: TimerEvent);

    /// Cancel the named timer if it is pending.
    fn remove(&mut self, name: TimerName);
}

struct Entry {
    deadline: Instant,
    delay: Duration,
    event: TimerEvent,
}

/// Deadline-based timer registry.
///
/// Holds at most one pending event per [`TimerName`]. A host loop asks for
/// [`next_deadline`](Self::next_deadline), waits, then drains
/// [`expire`](Self::expire).
#[derive(Default)]
pub struct TimerRegistry {
    entries: HashMap<TimerName, Entry>,
}

impl TimerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Remove and return every event due at `now`, earliest first
    pub fn expire(&mut self, now: Instant) -> Vec<TimerEvent> {
        let mut due: Vec<(Instant, TimerName)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .map(|(name, e)| (e.deadline, *name))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);

        due.into_iter()
            .filter_map(|(_, name)| self.entries.remove(&name))
            .map(|e| e.event)
            .collect()
    }

    /// Remove and return the named event regardless of its deadline
    pub fn take(&mut self, name: TimerName) -> Option<TimerEvent> {
        self.entries.remove(&name).map(|e| e.event)
    }

    /// Whether the named timer is pending
    pub fn is_pending(&self, name: TimerName) -> bool {
        self.entries.contains_key(&name)
    }

    /// Delay the named timer was scheduled with
    pub fn delay(&self, name: TimerName) -> Option<Duration> {
        self.entries.get(&name).map(|e| e.delay)
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timer is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Timers for TimerRegistry {
    fn add(&mut self, delay: Duration, event: TimerEvent) {
        let name = event.name();
        tracing::trace!("Timer {} set for {:?}", name, delay);
        self.entries.insert(
            name,
            Entry {
                deadline: Instant::now() + delay,
                delay,
                event,
            },
        );
    }

    fn remove(&mut self, name: TimerName) {
        if self.entries.remove(&name).is_some() {
            tracing::trace!("Timer {} cancelled", name);
        }
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_same_name() {
        let mut timers = TimerRegistry::new();
        timers.add(Duration::from_secs(10), TimerEvent::Publish);
        timers.add(Duration::from_millis(5), TimerEvent::Publish);

        assert_eq!(timers.len(), 1);
        assert_eq!(timers.delay(TimerName::Publish), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_remove() {
        let mut timers = TimerRegistry::new();
        timers.add(Duration::from_secs(1), TimerEvent::Reconnect);
        assert!(timers.is_pending(TimerName::Reconnect));

        timers.remove(TimerName::Reconnect);
        assert!(!timers.is_pending(TimerName::Reconnect));
        timers.remove(TimerName::Reconnect);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_expire_in_deadline_order() {
        let mut timers = TimerRegistry::new();
        timers.add(Duration::from_millis(20), TimerEvent::Connect);
        timers.add(Duration::ZERO, TimerEvent::Publish);
        timers.add(Duration::from_secs(3600), TimerEvent::Reconnect);

        let fired = timers.expire(Instant::now() + Duration::from_millis(50));
        let names: Vec<TimerName> = fired.iter().map(TimerEvent::name).collect();
        assert_eq!(names, vec![TimerName::Publish, TimerName::Connect]);
        assert!(timers.is_pending(TimerName::Reconnect));
    }

    #[test]
    fn test_next_deadline() {
        let mut timers = TimerRegistry::new();
        assert!(timers.next_deadline().is_none());

        let before = Instant::now();
        timers.add(Duration::from_secs(5), TimerEvent::Reconnect);
        timers.add(Duration::from_secs(1), TimerEvent::Connect);

        let deadline = timers.next_deadline().unwrap();
        assert!(deadline >= before + Duration::from_secs(1));
        assert!(deadline < before + Duration::from_secs(5));
    }

    #[test]
    fn test_take_ignores_deadline() {
        let mut timers = TimerRegistry::new();
        timers.add(Duration::from_secs(3600), TimerEvent::Handshake);

        let event = timers.take(TimerName::Handshake).unwrap();
        assert_eq!(event.name(), TimerName::Handshake);
        assert!(timers.take(TimerName::Handshake).is_none());
    }
}
