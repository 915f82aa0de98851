//! Order book operations like adding, modifying and canceling orders

use super::book::OrderBook;
use super::delta::DeltaKind;
use super::error::OrderBookError;
use super::trade::MatchOutcome;
use crate::core::{IntentId, OrderId, OrderIntent, Side, TimeInForce};
use crate::utils::monotonic_nanos;
use tracing::trace;

/// The result of a modify request.
#[derive(Debug, Clone)]
pub enum ModifyOutcome {
    /// Quantity was reduced in place; queue position is preserved.
    Reduced {
        /// The unchanged order id.
        order_id: OrderId,
        /// New open quantity after the reduction.
        remaining: u64,
    },
    /// The change required cancel-then-replace; time priority is lost.
    Replaced {
        /// The cancelled original order.
        cancelled: OrderId,
        /// Outcome of the replacement intent, which may have traded.
        outcome: MatchOutcome,
    },
}

impl OrderBook {
    /// Run an admitted intent through matching, then resolve any stop
    /// orders its fills triggered.
    ///
    /// # Errors
    /// See [`OrderBook::execute_intent`].
    pub fn submit(&self, intent: &OrderIntent) -> Result<MatchOutcome, OrderBookError> {
        trace!(
            "submitting {} {} {} x{} on {}",
            intent.kind, intent.side, intent.intent_id, intent.quantity, intent.symbol
        );
        let outcome = self.execute_intent(intent)?;
        if !outcome.trades.is_empty() {
            self.process_triggered_stops();
        }
        Ok(outcome)
    }

    /// Add a limit order to the book.
    ///
    /// Convenience wrapper used by tests and direct embedders; the engine
    /// path submits full [`OrderIntent`]s.
    ///
    /// # Errors
    /// See [`OrderBook::execute_intent`].
    pub fn add_limit_order(
        &self,
        intent_id: IntentId,
        side: Side,
        price: u64,
        quantity: u64,
        tif: TimeInForce,
    ) -> Result<MatchOutcome, OrderBookError> {
        let mut intent = OrderIntent::limit(self.symbol(), side, price, quantity, tif);
        intent.intent_id = intent_id;
        intent.arrival_ns = monotonic_nanos();
        self.submit(&intent)
    }

    /// Submit a market order.
    ///
    /// # Errors
    /// See [`OrderBook::execute_intent`].
    pub fn submit_market_order(
        &self,
        intent_id: IntentId,
        side: Side,
        quantity: u64,
    ) -> Result<MatchOutcome, OrderBookError> {
        let mut intent = OrderIntent::market(self.symbol(), side, quantity);
        intent.intent_id = intent_id;
        intent.arrival_ns = monotonic_nanos();
        self.submit(&intent)
    }

    /// Modify a resting order.
    ///
    /// A pure quantity decrease at the same price edits the order in place
    /// and keeps its queue position. Any price change, or a quantity
    /// increase, is treated as cancel-then-replace and loses time priority;
    /// the replacement may trade immediately.
    ///
    /// # Errors
    /// Returns [`OrderBookError::OrderNotFound`] for unknown ids and
    /// [`OrderBookError::InvalidModify`] when nothing would change.
    pub fn modify_order(
        &self,
        order_id: OrderId,
        new_quantity: Option<u64>,
        new_price: Option<u64>,
    ) -> Result<ModifyOutcome, OrderBookError> {
        self.ensure_live()?;

        let current = self
            .get_order(order_id)
            .ok_or(OrderBookError::OrderNotFound(order_id))?;
        let target_quantity = new_quantity.unwrap_or(current.quantity);
        let target_price = new_price.unwrap_or(current.price);

        if target_quantity == 0 {
            return Err(OrderBookError::NonPositiveQuantity);
        }
        if !target_quantity.is_multiple_of(self.lot_size()) {
            return Err(OrderBookError::InvalidLot {
                quantity: target_quantity,
                lot_size: self.lot_size(),
            });
        }
        self.ladder(current.side).validate_price(target_price)?;

        if target_price == current.price && target_quantity == current.quantity {
            return Err(OrderBookError::InvalidModify {
                message: format!("order {order_id} already at {target_quantity}@{target_price}"),
            });
        }

        if target_price == current.price && target_quantity < current.quantity {
            let ladder = self.ladder(current.side);
            let Some(level) = ladder.get(current.price) else {
                return Err(self.freeze(format!(
                    "modify found index entry without level: {order_id} at {} {}",
                    current.price, current.side
                )));
            };
            let Some(remaining) = level.reduce_quantity(order_id, target_quantity) else {
                return Err(self.freeze(format!(
                    "modify found level without order: {order_id} at {} {}",
                    current.price, current.side
                )));
            };
            trace!(
                "reduced order {} to {} open at {}",
                order_id, remaining, current.price
            );
            self.emit_delta(
                DeltaKind::Modify,
                Some(current.side),
                current.price,
                remaining,
                Some(order_id),
            );
            if remaining == 0 {
                // The reduction clamped at the filled amount; nothing stays open.
                let _ = level.remove(order_id);
                self.order_index.remove(&order_id);
                self.untrack_client_order(&current.client_id, order_id);
                ladder.remove_if_empty(current.price);
                self.emit_delta(
                    DeltaKind::Delete,
                    Some(current.side),
                    current.price,
                    0,
                    Some(order_id),
                );
            }
            return Ok(ModifyOutcome::Reduced {
                order_id,
                remaining,
            });
        }

        // Price change or quantity increase: cancel-then-replace.
        self.cancel_order(order_id)?;
        let replacement = OrderIntent {
            intent_id: current.intent_id,
            client_id: current.client_id.clone(),
            client_order_id: current.client_order_id.clone(),
            symbol: self.symbol().to_string(),
            side: current.side,
            kind: crate::core::OrderKind::Limit,
            tif: current.tif,
            quantity: target_quantity,
            limit_price: Some(target_price),
            stop_price: None,
            strategy_id: current.strategy_id.clone(),
            arrival_ns: monotonic_nanos(),
        };
        trace!(
            "replacing order {} with {}@{} (priority lost)",
            order_id, target_quantity, target_price
        );
        let outcome = self.submit(&replacement)?;
        Ok(ModifyOutcome::Replaced {
            cancelled: order_id,
            outcome,
        })
    }
}
