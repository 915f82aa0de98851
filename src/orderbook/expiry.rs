//! Housekeeping for time-limited orders.
//!
//! GTD orders are also dropped lazily when matching walks over them; the
//! scan here is the backstop that clears expiries on quiet books.

use super::book::OrderBook;
use crate::core::OrderId;
use tracing::debug;

impl OrderBook {
    /// Cancel every resting order and parked stop whose GTD expiry has
    /// passed. Returns the cancelled order ids.
    ///
    /// Runs on the book's writer thread at the engine's configured cadence.
    pub fn scan_expired(&self, now_ns: u64) -> Vec<OrderId> {
        if self.is_frozen() {
            return Vec::new();
        }

        let mut expired = Vec::new();
        for ladder in [&self.bids, &self.asks] {
            ladder.walk_from_best(|level| {
                let orders = level.orders();
                for order in orders.iter() {
                    if order.tif.is_expired(now_ns) {
                        expired.push(order.order_id);
                    }
                }
                true
            });
        }

        {
            let stops = self.stops.lock();
            for parked in stops.iter() {
                if parked.intent.tif.is_expired(now_ns) {
                    expired.push(parked.order_id);
                }
            }
        }

        let mut cancelled = Vec::with_capacity(expired.len());
        for order_id in expired {
            if self.cancel_order(order_id).is_ok() {
                cancelled.push(order_id);
            }
        }
        if !cancelled.is_empty() {
            debug!(
                "expiry scan cancelled {} orders on {}",
                cancelled.len(),
                self.symbol()
            );
        }
        cancelled
    }
}
