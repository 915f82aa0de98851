//! Engine-assigned identifiers.
//!
//! Order and intent ids are dense `u64`s handed out by per-engine counters so
//! the hot path never allocates for an id. Trade ids are UUIDs derived from a
//! per-book namespace and a monotonic counter, which keeps them unique across
//! books and reproducible within one.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identifier of a resting order within a book.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct OrderId(pub u64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "O-{}", self.0)
    }
}

/// Identifier of an order intent, assigned at admission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct IntentId(pub u64);

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "I-{}", self.0)
    }
}

/// Generator for unique trade ids.
///
/// Each generated id is a v5 UUID of a monotonic counter under the
/// generator's random namespace.
#[derive(Debug)]
pub struct TradeIdGenerator {
    namespace: Uuid,
    counter: AtomicU64,
}

impl TradeIdGenerator {
    /// Create a generator with a fresh random namespace.
    pub fn new() -> Self {
        Self {
            namespace: Uuid::new_v4(),
            counter: AtomicU64::new(0),
        }
    }

    /// Produce the next trade id.
    pub fn next(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Uuid::new_v5(&self.namespace, &n.to_le_bytes())
    }
}

impl Default for TradeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
