//! Status-gated callback queue.
//!
//! Callers park work behind a status; setting that status hands every parked
//! item back, in arrival order. While the gate already sits at the requested
//! status, items are returned immediately instead of being parked.

use std::collections::HashMap;

/// Gate statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeferredStatus {
    /// Work waits
    #[default]
    Deferred,
    /// Work may run
    Succeeded,
}

/// Queue of items released when a status is reached
#[derive(Debug)]
pub struct CallbackGate<T> {
    status: DeferredStatus,
    queues: HashMap<DeferredStatus, Vec<T>>,
}

impl<T> Default for CallbackGate<T> {
    fn default() -> Self {
        Self {
            status: DeferredStatus::default(),
            queues: HashMap::new(),
        }
    }
}

impl<T> CallbackGate<T> {
    /// Create a gate in the `Deferred` status
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status
    pub fn status(&self) -> DeferredStatus {
        self.status
    }

    /// Park `item` until `status` is reached.
    ///
    /// Returns the item back if the gate is already at `status`; the caller
    /// runs it right away.
    pub fn run_when(&mut self, status: DeferredStatus, item: T) -> Option<T> {
        if self.status == status {
            return Some(item);
        }
        self.queues.entry(status).or_default().push(item);
        None
    }

    /// Move to `status` and release everything parked behind it
    pub fn set_status(&mut self, status: DeferredStatus) -> Vec<T> {
        self.status = status;
        self.queues.remove(&status).unwrap_or_default()
    }

    /// Number of parked items across all statuses
    pub fn len(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }

    /// Whether nothing is parked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
