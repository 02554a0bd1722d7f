//! Human-readable booking sequence ids.
//!
//! Every booking carries an external id like `Retrowoods-042` alongside its
//! internal UUID. Sequence ids increase strictly by one per allocation and
//! are never reused, even after a booking is deleted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// External, human-readable booking identifier (e.g. `Retrowoods-042`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(String);

impl SequenceId {
    /// Creates a sequence id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SequenceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Allocator of strictly increasing booking sequence ids.
pub trait SequenceAllocator: Send + Sync {
    /// Allocates the next sequence id.
    fn next(&self) -> SequenceId;
}

/// Atomic counter-backed allocator.
///
/// Numbers are zero-padded to at least three digits and keep growing past
/// 999 (`Retrowoods-1000`).
pub struct InMemorySequenceAllocator {
    prefix: String,
    counter: AtomicU64,
}

impl InMemorySequenceAllocator {
    /// Creates an allocator with the given prefix, starting at 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Creates an allocator that resumes after `last_allocated`.
    pub fn resuming_from(prefix: impl Into<String>, last_allocated: u64) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(last_allocated),
        }
    }
}

impl Default for InMemorySequenceAllocator {
    fn default() -> Self {
        Self::new("Retrowoods")
    }
}

impl SequenceAllocator for InMemorySequenceAllocator {
    fn next(&self) -> SequenceId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        SequenceId(format!("{}-{:03}", self.prefix, n))
    }
}
