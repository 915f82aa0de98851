//! Book deltas: atomic state-change events with sequence numbers.

use crate::core::{OrderId, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What kind of state change a delta describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaKind {
    /// A resting order was added to a level.
    Add,
    /// A resting order's open quantity changed in place.
    Modify,
    /// A resting order left the book (cancel or expiry).
    Delete,
    /// A fill; `quantity` is the traded quantity.
    Trade,
}

/// Price and size of one side's best level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestQuote {
    /// Best price in ticks.
    pub price: u64,
    /// Remaining quantity at that price.
    pub quantity: u64,
}

/// An atomic book state change.
///
/// Deltas for one symbol carry strictly increasing sequence numbers with no
/// gaps; the best bid/ask snapshot reflects the book after the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDelta {
    /// Trading symbol.
    pub symbol: String,
    /// Book sequence number of this event.
    pub seq: u64,
    /// The kind of change.
    pub kind: DeltaKind,
    /// Side of the affected order or level, where applicable.
    pub side: Option<Side>,
    /// Price of the affected level in ticks.
    pub price: u64,
    /// Changed or traded quantity in lots.
    pub quantity: u64,
    /// Affected resting order, where applicable.
    pub order_id: Option<OrderId>,
    /// Best bid after the event, if any.
    pub best_bid: Option<BestQuote>,
    /// Best ask after the event, if any.
    pub best_ask: Option<BestQuote>,
    /// Monotonic timestamp in nanoseconds. Descriptive only; `seq` is the
    /// ordering truth.
    pub timestamp_ns: u64,
}

/// A thread-safe listener callback for book delta events.
///
/// Called on the book's writer thread for every state-changing event, in
/// sequence order. Implementations must not block.
pub type DeltaListener = Arc<dyn Fn(&BookDelta) + Send + Sync>;
