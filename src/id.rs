//! Correlation id generation.

/// Source of process-unique message ids
pub trait IdGenerator {
    /// Produce an id not returned before
    fn next_id(&mut self) -> String;
}

/// Random UUID v4 ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Monotonic counter ids, handy for deterministic logs and tests
#[derive(Debug, Clone, Default)]
pub struct SequenceGenerator {
    next: u64,
}

impl IdGenerator for SequenceGenerator {
    fn next_id(&mut self) -> String {
        self.next += 1;
        self.next.to_string()
    }
}
