//! Mass cancellation: clear a whole book or one client's orders.

use super::book::OrderBook;
use crate::core::OrderId;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The orders removed by a mass-cancel operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MassCancelResult {
    cancelled: Vec<OrderId>,
}

impl MassCancelResult {
    /// Ids of the cancelled orders, in cancellation order.
    #[must_use]
    pub fn cancelled_order_ids(&self) -> &[OrderId] {
        &self.cancelled
    }

    /// Number of orders cancelled.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    /// Whether nothing was cancelled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }
}

impl OrderBook {
    /// Cancel every resting order and parked stop on this book.
    pub fn cancel_all_orders(&self) -> MassCancelResult {
        let mut targets: Vec<OrderId> = self.order_index.iter().map(|e| *e.key()).collect();
        {
            let stops = self.stops.lock();
            targets.extend(stops.iter().map(|s| s.order_id));
        }
        self.cancel_batch(targets)
    }

    /// Cancel every resting order and parked stop owned by `client_id`.
    pub fn cancel_client_orders(&self, client_id: &str) -> MassCancelResult {
        if client_id.is_empty() {
            return MassCancelResult::default();
        }
        let mut targets: Vec<OrderId> = self
            .client_orders
            .get(client_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        {
            let stops = self.stops.lock();
            targets.extend(
                stops
                    .iter()
                    .filter(|s| s.intent.client_id == client_id)
                    .map(|s| s.order_id),
            );
        }
        self.cancel_batch(targets)
    }

    fn cancel_batch(&self, targets: Vec<OrderId>) -> MassCancelResult {
        let mut result = MassCancelResult::default();
        for order_id in targets {
            if self.cancel_order(order_id).is_ok() {
                result.cancelled.push(order_id);
            }
        }
        if !result.is_empty() {
            info!(
                "mass cancel removed {} orders on {}",
                result.cancelled_count(),
                self.symbol()
            );
        }
        result
    }
}
