//! A single price level: a FIFO of resting orders with atomic aggregates.
//!
//! The FIFO sits behind a read-write lock under the book's single-writer
//! discipline: only the matching worker takes the write lock, snapshot
//! readers take short read locks, and the aggregate remaining quantity and
//! order count are atomics so dry-walks and depth queries never lock at all.

use crate::core::{IntentId, OrderId, Side, TimeInForce};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A limit order accepted into the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    /// Book-assigned order id.
    pub order_id: OrderId,
    /// The intent this order came from.
    pub intent_id: IntentId,
    /// Owning client; empty means anonymous.
    pub client_id: String,
    /// Client-chosen opaque id.
    pub client_order_id: String,
    /// Originating strategy.
    pub strategy_id: String,
    /// Buy or sell.
    pub side: Side,
    /// Limit price in ticks.
    pub price: u64,
    /// Original quantity in lots.
    pub quantity: u64,
    /// Quantity filled so far.
    pub filled: u64,
    /// Time-in-force; GTD orders carry their expiry here.
    pub tif: TimeInForce,
    /// Book sequence at creation; the price-time priority tie-break.
    pub creation_seq: u64,
    /// Monotonic arrival timestamp in nanoseconds.
    pub arrival_ns: u64,
}

impl RestingOrder {
    /// Unfilled quantity.
    #[must_use]
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.quantity.saturating_sub(self.filled)
    }

    /// Whether the order has been fully consumed.
    #[must_use]
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled >= self.quantity
    }
}

/// Aggregate view of one price level, used in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Level price in ticks.
    pub price: u64,
    /// Sum of remaining quantity across the level's orders.
    pub quantity: u64,
    /// Number of resting orders at the level.
    pub order_count: usize,
}

/// One price level of a ladder.
///
/// Invariants: `total_quantity` equals the sum of members' remaining
/// quantity, `order_count` equals the FIFO length, and the level is removed
/// from its ladder once the aggregate reaches zero.
#[derive(Debug)]
pub struct PriceLevel {
    price: u64,
    total_quantity: AtomicU64,
    order_count: AtomicUsize,
    orders: RwLock<VecDeque<RestingOrder>>,
}

impl PriceLevel {
    /// Create an empty level at `price`.
    pub fn new(price: u64) -> Self {
        Self {
            price,
            total_quantity: AtomicU64::new(0),
            order_count: AtomicUsize::new(0),
            orders: RwLock::new(VecDeque::new()),
        }
    }

    /// The level's price in ticks.
    #[must_use]
    #[inline]
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Aggregate remaining quantity, readable without locking.
    #[must_use]
    #[inline]
    pub fn total_quantity(&self) -> u64 {
        self.total_quantity.load(Ordering::Acquire)
    }

    /// Number of resting orders, readable without locking.
    #[must_use]
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_count.load(Ordering::Acquire)
    }

    /// Whether the level holds no quantity.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count() == 0
    }

    /// Append an order at the back of the FIFO.
    pub(crate) fn push_back(&self, order: RestingOrder) {
        let remaining = order.remaining();
        let mut orders = self.orders.write();
        orders.push_back(order);
        self.order_count.store(orders.len(), Ordering::Release);
        self.total_quantity.fetch_add(remaining, Ordering::AcqRel);
    }

    /// Remove an order by id, returning it.
    pub(crate) fn remove(&self, order_id: OrderId) -> Option<RestingOrder> {
        let mut orders = self.orders.write();
        let position = orders.iter().position(|o| o.order_id == order_id)?;
        let order = orders.remove(position)?;
        self.order_count.store(orders.len(), Ordering::Release);
        self.total_quantity
            .fetch_sub(order.remaining(), Ordering::AcqRel);
        Some(order)
    }

    /// Reduce an order's open quantity in place, preserving queue position.
    /// Returns the order's new remaining quantity.
    pub(crate) fn reduce_quantity(
        &self,
        order_id: OrderId,
        new_quantity: u64,
    ) -> Option<u64> {
        let mut orders = self.orders.write();
        let order = orders.iter_mut().find(|o| o.order_id == order_id)?;
        let before = order.remaining();
        order.quantity = new_quantity.max(order.filled);
        let after = order.remaining();
        self.total_quantity
            .fetch_sub(before.saturating_sub(after), Ordering::AcqRel);
        Some(after)
    }

    /// Write access to the FIFO for the matching worker. The caller must
    /// keep the atomic aggregates in sync via [`Self::sync_aggregates`].
    pub(crate) fn orders_mut(&self) -> RwLockWriteGuard<'_, VecDeque<RestingOrder>> {
        self.orders.write()
    }

    /// Read access to the FIFO for snapshot readers.
    pub(crate) fn orders(&self) -> RwLockReadGuard<'_, VecDeque<RestingOrder>> {
        self.orders.read()
    }

    /// Subtract filled or removed quantity from the aggregate.
    #[inline]
    pub(crate) fn debit(&self, quantity: u64) {
        self.total_quantity.fetch_sub(quantity, Ordering::AcqRel);
    }

    /// Publish a new FIFO length after a writer-side mutation.
    #[inline]
    pub(crate) fn set_order_count(&self, count: usize) {
        self.order_count.store(count, Ordering::Release);
    }

    /// Recompute the atomic aggregates from the FIFO contents.
    pub(crate) fn sync_aggregates(&self, orders: &VecDeque<RestingOrder>) {
        let total: u64 = orders.iter().map(RestingOrder::remaining).sum();
        self.total_quantity.store(total, Ordering::Release);
        self.order_count.store(orders.len(), Ordering::Release);
    }

    /// Aggregate view for publishing.
    #[must_use]
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            price: self.price,
            quantity: self.total_quantity(),
            order_count: self.order_count(),
        }
    }
}
