//! Trades and matching outcomes.

use crate::core::{IntentId, IntentState, OrderId, Side};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A single fill produced by the matching engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade id.
    pub trade_id: Uuid,
    /// Trading symbol.
    pub symbol: String,
    /// Execution price in ticks (the resting order's price).
    pub price: u64,
    /// Traded quantity in lots.
    pub quantity: u64,
    /// Side of the aggressor.
    pub aggressor_side: Side,
    /// The incoming intent that caused the fill.
    pub aggressor_intent_id: IntentId,
    /// The resting order that was hit.
    pub passive_order_id: OrderId,
    /// Monotonic timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Book sequence number of the fill.
    pub seq: u64,
}

/// A thread-safe listener callback for trades.
///
/// Called on the book's writer thread for every fill, in sequence order.
/// Implementations must not block.
pub type TradeListener = Arc<dyn Fn(&Trade) + Send + Sync>;

/// The result of running one intent through the matching engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// The intent that was matched.
    pub intent_id: IntentId,
    /// Terminal state the intent reached.
    pub state: IntentState,
    /// Book-assigned order id when a remainder rested (or a stop parked).
    pub order_id: Option<OrderId>,
    /// Total quantity executed.
    pub executed_quantity: u64,
    /// Quantity left unexecuted (rested or discarded).
    pub remaining_quantity: u64,
    /// Fills in execution order.
    pub trades: Vec<Trade>,
    /// Quantity the aggressor skipped against its own resting orders under
    /// the self-trade policy.
    pub self_trade_skipped: u64,
}

impl MatchOutcome {
    pub(crate) fn new(intent_id: IntentId, quantity: u64) -> Self {
        Self {
            intent_id,
            state: IntentState::Matching,
            order_id: None,
            executed_quantity: 0,
            remaining_quantity: quantity,
            trades: Vec::new(),
            self_trade_skipped: 0,
        }
    }

    /// Whether the intent was fully executed.
    #[must_use]
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.remaining_quantity == 0
    }
}
