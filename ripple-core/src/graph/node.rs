//! Graph Keys
//!
//! Identifiers for the observable side of the dependency graph: which
//! subject was read, and under which key.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Key used by ref cells and computed values for their single slot.
pub const VALUE_KEY: &str = "value";

/// A field name as stored in the graph.
pub type Key = Arc<str>;

/// Unique identifier for an observable subject (a record or a cell slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Generate a new unique subject ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subject#{}", self.0)
    }
}

/// A (subject, key) pair that some subscriber read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub subject: SubjectId,
    pub key: Key,
}

impl Source {
    pub fn new(subject: SubjectId, key: &str) -> Self {
        Self {
            subject,
            key: Arc::from(key),
        }
    }
}
