//! Core OrderBook implementation for managing price levels and orders

use super::delta::{BestQuote, BookDelta, DeltaKind, DeltaListener};
use super::error::OrderBookError;
use super::ladder::Ladder;
use super::level::RestingOrder;
use super::self_trade::SelfTradePolicy;
use super::trade::TradeListener;
use crate::core::{OrderId, Side, TradeIdGenerator};
use crate::utils::monotonic_nanos;
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{error, trace};

/// A single-symbol limit order book: bid and ask ladders, a per-order index,
/// and a monotonically increasing sequence number stamped on every
/// state-changing event.
///
/// The book is single-writer: exactly one matching worker mutates it.
/// Snapshot readers are permitted concurrently and never block the writer
/// beyond brief per-level read locks. Every resting order is reachable both
/// through the order index and through its price level; the two views are
/// kept in agreement by the writer, and a disagreement freezes the book.
pub struct OrderBook {
    /// The symbol or identifier for this order book
    symbol: String,

    /// Minimum quantity increment for orders
    lot_size: u64,

    /// What happens when an aggressor would cross its own resting order
    self_trade_policy: SelfTradePolicy,

    /// Bid side price levels, walked price-descending
    pub(super) bids: Ladder,

    /// Ask side price levels, walked price-ascending
    pub(super) asks: Ladder,

    /// Map from order id to (price, side) for O(1) lookup and removal
    pub(super) order_index: DashMap<OrderId, (u64, Side)>,

    /// Map from client id to that client's resting order ids, maintained for
    /// O(1) client-scoped mass cancellation
    pub(super) client_orders: DashMap<String, Vec<OrderId>>,

    /// Strictly increasing sequence, incremented once per emitted event
    sequence: AtomicU64,

    /// Counter for book-assigned order ids
    next_order_id: AtomicU64,

    /// The last price at which a trade occurred
    last_trade_price: AtomicCell<u64>,

    /// Monotonic timestamp of the last trade
    last_trade_ns: AtomicU64,

    /// Flag indicating if there was a trade
    has_traded: AtomicBool,

    /// Total quantity traded over the book's lifetime
    cumulative_volume: AtomicU64,

    /// Set after an invariant violation; all further intents are refused
    frozen: AtomicBool,

    /// Generator for unique trade ids
    pub(super) trade_ids: TradeIdGenerator,

    /// Stop and stop-limit orders parked until their trigger price prints
    pub(super) stops: Mutex<VecDeque<ParkedStop>>,

    /// listens to fills as they are produced by the matching engine
    pub trade_listener: Option<TradeListener>,

    /// listens to book state changes. This provides a point to mirror the
    /// book into an external view, e.g. a market-data publisher
    pub delta_listener: Option<DeltaListener>,
}

/// A stop or stop-limit intent waiting for its trigger price.
#[derive(Debug, Clone)]
pub struct ParkedStop {
    /// Book-assigned id, cancellable like a resting order.
    pub order_id: OrderId,
    /// The original intent, re-injected on trigger.
    pub intent: crate::core::OrderIntent,
}

impl OrderBook {
    /// Create a new order book with tick and lot size 1 and the default
    /// self-trade policy.
    pub fn new(symbol: &str) -> Self {
        Self::with_config(symbol, 1, 1, SelfTradePolicy::default())
    }

    /// Create a new order book with explicit increment discipline and
    /// self-trade policy.
    ///
    /// Prices must be exact multiples of `tick_size` and quantities of
    /// `lot_size`; both validations reject at the ladder and book boundary
    /// respectively.
    pub fn with_config(
        symbol: &str,
        tick_size: u64,
        lot_size: u64,
        self_trade_policy: SelfTradePolicy,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            lot_size: lot_size.max(1),
            self_trade_policy,
            bids: Ladder::new(Side::Buy, tick_size.max(1)),
            asks: Ladder::new(Side::Sell, tick_size.max(1)),
            order_index: DashMap::new(),
            client_orders: DashMap::new(),
            sequence: AtomicU64::new(0),
            next_order_id: AtomicU64::new(1),
            last_trade_price: AtomicCell::new(0),
            last_trade_ns: AtomicU64::new(0),
            has_traded: AtomicBool::new(false),
            cumulative_volume: AtomicU64::new(0),
            frozen: AtomicBool::new(false),
            trade_ids: TradeIdGenerator::new(),
            stops: Mutex::new(VecDeque::new()),
            trade_listener: None,
            delta_listener: None,
        }
    }

    /// Attach a trade listener, consuming the book.
    #[must_use]
    pub fn with_trade_listener(mut self, listener: TradeListener) -> Self {
        self.trade_listener = Some(listener);
        self
    }

    /// Attach a delta listener, consuming the book.
    #[must_use]
    pub fn with_delta_listener(mut self, listener: DeltaListener) -> Self {
        self.delta_listener = Some(listener);
        self
    }

    /// The symbol this book serves.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The configured tick size.
    #[must_use]
    pub fn tick_size(&self) -> u64 {
        self.bids.tick_size()
    }

    /// The configured lot size.
    #[must_use]
    pub fn lot_size(&self) -> u64 {
        self.lot_size
    }

    /// The active self-trade policy.
    #[must_use]
    pub fn self_trade_policy(&self) -> SelfTradePolicy {
        self.self_trade_policy
    }

    /// The sequence number of the most recently emitted event.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Best bid price, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<u64> {
        self.best_quote(Side::Buy).map(|q| q.price)
    }

    /// Best ask price, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<u64> {
        self.best_quote(Side::Sell).map(|q| q.price)
    }

    /// Best price and size on one side, skipping levels that are empty but
    /// not yet unlinked.
    #[must_use]
    pub fn best_quote(&self, side: Side) -> Option<BestQuote> {
        let ladder = self.ladder(side);
        let mut quote = None;
        ladder.walk_from_best(|level| {
            let quantity = level.total_quantity();
            if quantity > 0 {
                quote = Some(BestQuote {
                    price: level.price(),
                    quantity,
                });
                false
            } else {
                true
            }
        });
        quote
    }

    /// Mid price from the best quotes.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Spread in ticks.
    #[must_use]
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Price and monotonic timestamp of the last trade, if any trade
    /// occurred.
    #[must_use]
    pub fn last_trade(&self) -> Option<(u64, u64)> {
        if self.has_traded.load(Ordering::Acquire) {
            Some((
                self.last_trade_price.load(),
                self.last_trade_ns.load(Ordering::Acquire),
            ))
        } else {
            None
        }
    }

    /// Total quantity traded over the book's lifetime.
    #[must_use]
    pub fn cumulative_volume(&self) -> u64 {
        self.cumulative_volume.load(Ordering::Acquire)
    }

    /// Number of resting orders (parked stops excluded).
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// Whether the book refused further processing after an invariant
    /// violation.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Look up a resting order by id, cloning it out of its level.
    #[must_use]
    pub fn get_order(&self, order_id: OrderId) -> Option<RestingOrder> {
        let (price, side) = *self.order_index.get(&order_id)?;
        let level = self.ladder(side).get(price)?;
        let orders = level.orders();
        orders.iter().find(|o| o.order_id == order_id).cloned()
    }

    /// Cancel a resting order or a parked stop.
    ///
    /// Returns the cancelled open quantity. A second cancel of the same id
    /// leaves the book unchanged and reports [`OrderBookError::OrderNotFound`].
    pub fn cancel_order(&self, order_id: OrderId) -> Result<u64, OrderBookError> {
        self.ensure_live()?;

        if let Some((_, (price, side))) = self.order_index.remove(&order_id) {
            let ladder = self.ladder(side);
            let Some(level) = ladder.get(price) else {
                return Err(self.freeze(format!(
                    "index references missing level: order {order_id} at {price} {side}"
                )));
            };
            let Some(order) = level.remove(order_id) else {
                return Err(self.freeze(format!(
                    "index references order absent from level: {order_id} at {price} {side}"
                )));
            };
            self.untrack_client_order(&order.client_id, order_id);
            ladder.remove_if_empty(price);
            let remaining = order.remaining();
            trace!("cancelled order {} ({} open)", order_id, remaining);
            self.emit_delta(
                DeltaKind::Delete,
                Some(side),
                price,
                remaining,
                Some(order_id),
            );
            return Ok(remaining);
        }

        // Not resting: it may be a parked stop.
        let mut stops = self.stops.lock();
        if let Some(position) = stops.iter().position(|s| s.order_id == order_id) {
            let parked = stops.remove(position).map(|s| s.intent.quantity).unwrap_or(0);
            trace!("cancelled parked stop {}", order_id);
            return Ok(parked);
        }

        Err(OrderBookError::OrderNotFound(order_id))
    }

    // ------------------------------------------------------------------
    // Writer-side internals shared by matching, modify and expiry.
    // ------------------------------------------------------------------

    #[inline]
    pub(super) fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub(super) fn ensure_live(&self) -> Result<(), OrderBookError> {
        if self.is_frozen() {
            Err(OrderBookError::Frozen {
                symbol: self.symbol.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Record an invariant violation, freeze the book and return the error.
    ///
    /// Frozen books refuse every subsequent intent until an operator
    /// recovery path (outside this crate) replaces them.
    pub(super) fn freeze(&self, detail: String) -> OrderBookError {
        self.frozen.store(true, Ordering::Release);
        error!("book {} frozen: {}", self.symbol, detail);
        OrderBookError::InvariantViolation { detail }
    }

    #[inline]
    pub(super) fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    pub(super) fn next_order_id(&self) -> OrderId {
        OrderId(self.next_order_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(super) fn record_trade_stats(&self, price: u64, quantity: u64, now_ns: u64) {
        self.last_trade_price.store(price);
        self.last_trade_ns.store(now_ns, Ordering::Release);
        self.has_traded.store(true, Ordering::Release);
        self.cumulative_volume.fetch_add(quantity, Ordering::AcqRel);
    }

    pub(super) fn track_client_order(&self, client_id: &str, order_id: OrderId) {
        if !client_id.is_empty() {
            self.client_orders
                .entry(client_id.to_string())
                .or_default()
                .push(order_id);
        }
    }

    pub(super) fn untrack_client_order(&self, client_id: &str, order_id: OrderId) {
        if client_id.is_empty() {
            return;
        }
        if let Some(mut entry) = self.client_orders.get_mut(client_id) {
            entry.value_mut().retain(|id| *id != order_id);
            if entry.value().is_empty() {
                drop(entry);
                self.client_orders.remove(client_id);
            }
        }
    }

    /// Emit a delta with the next sequence number and the post-event best
    /// quotes. Listeners run on the writer thread and must not call back
    /// into this book.
    pub(super) fn emit_delta(
        &self,
        kind: DeltaKind,
        side: Option<Side>,
        price: u64,
        quantity: u64,
        order_id: Option<OrderId>,
    ) -> u64 {
        let seq = self.next_seq();
        self.publish_delta(seq, kind, side, price, quantity, order_id);
        seq
    }

    /// Emit a delta under an already-assigned sequence number. Used where a
    /// trade and its book delta share one sequence slot.
    pub(super) fn publish_delta(
        &self,
        seq: u64,
        kind: DeltaKind,
        side: Option<Side>,
        price: u64,
        quantity: u64,
        order_id: Option<OrderId>,
    ) {
        if let Some(listener) = &self.delta_listener {
            listener(&BookDelta {
                symbol: self.symbol.clone(),
                seq,
                kind,
                side,
                price,
                quantity,
                order_id,
                best_bid: self.best_quote(Side::Buy),
                best_ask: self.best_quote(Side::Sell),
                timestamp_ns: monotonic_nanos(),
            });
        }
    }

    /// Verify the resting book is not crossed; freeze on violation.
    pub(super) fn check_not_crossed(&self) -> Result<(), OrderBookError> {
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask())
            && bid >= ask
        {
            return Err(self.freeze(format!("crossed resting book: bid {bid} >= ask {ask}")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("symbol", &self.symbol)
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("orders", &self.order_index.len())
            .field("seq", &self.sequence())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
