//! Contains the core matching engine logic for the order book.
//!
//! Matching enforces price-time priority: aggressor buyers walk the ask
//! ladder from the lowest price, aggressor sellers walk the bid ladder from
//! the highest, and within a level resting orders fill in FIFO arrival
//! order. A fill-or-kill intent is sized with a dry-walk and executed in the
//! same writer step, so the availability it saw cannot change underneath it.

use super::book::{OrderBook, ParkedStop};
use super::delta::DeltaKind;
use super::error::OrderBookError;
use super::level::RestingOrder;
use super::self_trade::is_self_match;
use super::trade::{MatchOutcome, Trade};
use crate::core::{IntentState, OrderIntent, OrderKind, Side, TimeInForce};
use crate::utils::monotonic_nanos;
use tracing::trace;

/// How an intent's kind resolves before the ladder walk.
enum Resolution {
    /// Run the walk with this effective limit and time-in-force.
    Execute {
        limit: Option<u64>,
        tif: TimeInForce,
        can_rest: bool,
    },
    /// The intent terminated without touching the ladders.
    Done(MatchOutcome),
}

impl OrderBook {
    /// Run one admitted intent through matching.
    ///
    /// Emits zero or more trades and deltas through the listeners, each
    /// stamped with the next sequence number, and returns the intent's
    /// terminal state. The resting book is never left crossed.
    ///
    /// # Errors
    /// Recoverable refusals ([`OrderBookError::FokUnfillable`],
    /// [`OrderBookError::SelfTradeBlocked`], tick/lot violations) leave the
    /// book consistent. [`OrderBookError::InvariantViolation`] freezes the
    /// book.
    pub fn execute_intent(&self, intent: &OrderIntent) -> Result<MatchOutcome, OrderBookError> {
        self.ensure_live()?;

        // The risk gate rejects non-positive quantities before dispatch;
        // seeing one here means an ingress path bypassed validation, and the
        // book cannot trust anything else that path delivered.
        if intent.quantity == 0 {
            return Err(self.freeze(format!(
                "zero-quantity intent {} reached the matcher",
                intent.intent_id
            )));
        }
        if !intent.quantity.is_multiple_of(self.lot_size()) {
            return Err(OrderBookError::InvalidLot {
                quantity: intent.quantity,
                lot_size: self.lot_size(),
            });
        }

        let now_ns = monotonic_nanos();
        let (limit, tif, can_rest) = match self.resolve_kind(intent)? {
            Resolution::Execute {
                limit,
                tif,
                can_rest,
            } => (limit, tif, can_rest),
            Resolution::Done(outcome) => return Ok(outcome),
        };

        // FOK sizes its fill with a dry-walk before any mutation. Quantity
        // the self-trade policy would skip is unavailable to it.
        if tif == TimeInForce::Fok {
            let available = self.crossable_quantity(intent, limit, now_ns);
            if available < intent.quantity {
                trace!(
                    "fok intent {} unfillable: requested {}, available {}",
                    intent.intent_id, intent.quantity, available
                );
                return Err(OrderBookError::FokUnfillable {
                    requested: intent.quantity,
                    available,
                });
            }
        }

        let mut outcome = MatchOutcome::new(intent.intent_id, intent.quantity);
        let policy = self.self_trade_policy();
        let opposite = self.ladder(intent.side.opposite());
        let mut remaining = intent.quantity;
        let mut aggressor_cancelled = false;

        while remaining > 0 && !aggressor_cancelled {
            let Some(level) = opposite.best_level() else {
                break;
            };
            let price = level.price();
            if !intent.side.crosses(limit, price) {
                break;
            }

            {
                let mut orders = level.orders_mut();
                let mut i = 0;
                while i < orders.len() && remaining > 0 {
                    if orders[i].tif.is_expired(now_ns) {
                        let Some(expired) = orders.remove(i) else { break };
                        level.debit(expired.remaining());
                        level.set_order_count(orders.len());
                        self.order_index.remove(&expired.order_id);
                        self.untrack_client_order(&expired.client_id, expired.order_id);
                        self.emit_delta(
                            DeltaKind::Delete,
                            Some(expired.side),
                            price,
                            expired.remaining(),
                            Some(expired.order_id),
                        );
                        continue;
                    }

                    if is_self_match(policy, &intent.client_id, &orders[i].client_id) {
                        if policy.cancels_resting() {
                            let Some(own) = orders.remove(i) else { break };
                            level.debit(own.remaining());
                            level.set_order_count(orders.len());
                            self.order_index.remove(&own.order_id);
                            self.untrack_client_order(&own.client_id, own.order_id);
                            trace!(
                                "self-trade: cancelled resting {} against intent {}",
                                own.order_id, intent.intent_id
                            );
                            self.emit_delta(
                                DeltaKind::Delete,
                                Some(own.side),
                                price,
                                own.remaining(),
                                Some(own.order_id),
                            );
                        }
                        if policy.cancels_aggressor() {
                            aggressor_cancelled = true;
                            outcome.self_trade_skipped = remaining;
                            break;
                        }
                        continue;
                    }

                    let fill = remaining.min(orders[i].remaining());
                    orders[i].filled += fill;
                    remaining -= fill;
                    level.debit(fill);

                    let passive_id = orders[i].order_id;
                    let passive_side = orders[i].side;
                    if orders[i].is_filled() {
                        let Some(done) = orders.remove(i) else { break };
                        level.set_order_count(orders.len());
                        self.order_index.remove(&done.order_id);
                        self.untrack_client_order(&done.client_id, done.order_id);
                    } else {
                        i += 1;
                    }

                    let seq = self.next_seq();
                    self.record_trade_stats(price, fill, now_ns);
                    let trade = Trade {
                        trade_id: self.trade_ids.next(),
                        symbol: self.symbol().to_string(),
                        price,
                        quantity: fill,
                        aggressor_side: intent.side,
                        aggressor_intent_id: intent.intent_id,
                        passive_order_id: passive_id,
                        timestamp_ns: now_ns,
                        seq,
                    };
                    if let Some(listener) = &self.trade_listener {
                        listener(&trade);
                    }
                    self.publish_delta(
                        seq,
                        DeltaKind::Trade,
                        Some(passive_side),
                        price,
                        fill,
                        Some(passive_id),
                    );
                    outcome.trades.push(trade);
                }
            }

            if level.is_empty() {
                opposite.remove(price);
            } else if remaining > 0 && !aggressor_cancelled {
                // The inner loop drained what it could; anything left at
                // this level is unmatched for a reason that stops the walk.
                break;
            }
        }

        outcome.executed_quantity = intent.quantity - remaining;
        outcome.remaining_quantity = remaining;

        if aggressor_cancelled {
            if outcome.trades.is_empty() {
                return Err(OrderBookError::SelfTradeBlocked {
                    policy,
                    intent_id: intent.intent_id,
                });
            }
            outcome.state = IntentState::Canceled;
        } else if remaining > 0 {
            if can_rest && tif.allows_resting(now_ns) {
                let price = limit.ok_or(OrderBookError::MissingLimitPrice {
                    kind: intent.kind,
                })?;
                if let Some(quote) = self.best_quote(intent.side.opposite())
                    && intent.side.crosses(Some(price), quote.price)
                {
                    return Err(self.freeze(format!(
                        "resting remainder of intent {} at {price} would cross opposite best {}",
                        intent.intent_id, quote.price
                    )));
                }
                let level = self.ladder(intent.side).find_or_insert(price)?;
                let order_id = self.next_order_id();
                let seq = self.next_seq();
                level.push_back(RestingOrder {
                    order_id,
                    intent_id: intent.intent_id,
                    client_id: intent.client_id.clone(),
                    client_order_id: intent.client_order_id.clone(),
                    strategy_id: intent.strategy_id.clone(),
                    side: intent.side,
                    price,
                    quantity: remaining,
                    filled: 0,
                    tif,
                    creation_seq: seq,
                    arrival_ns: intent.arrival_ns,
                });
                self.order_index.insert(order_id, (price, intent.side));
                self.track_client_order(&intent.client_id, order_id);
                self.publish_delta(
                    seq,
                    DeltaKind::Add,
                    Some(intent.side),
                    price,
                    remaining,
                    Some(order_id),
                );
                outcome.order_id = Some(order_id);
                outcome.state = IntentState::Resting;
            } else {
                // IOC discard, or a market remainder with nothing to hit.
                trace!(
                    "intent {} discarded {} unfilled",
                    intent.intent_id, remaining
                );
                outcome.state = IntentState::Canceled;
            }
        } else {
            outcome.state = IntentState::Filled;
        }

        self.check_not_crossed()?;
        Ok(outcome)
    }

    /// Re-inject parked stops whose trigger price has printed. Runs until no
    /// further stops trigger, so a fill cascade resolves in one call.
    ///
    /// Call after any [`Self::execute_intent`] that produced trades.
    pub fn process_triggered_stops(&self) -> Vec<MatchOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let Some((last_price, _)) = self.last_trade() else {
                return outcomes;
            };
            let triggered: Vec<ParkedStop> = {
                let mut stops = self.stops.lock();
                let mut taken = Vec::new();
                let mut i = 0;
                while i < stops.len() {
                    if stop_triggered(&stops[i].intent, last_price) {
                        if let Some(parked) = stops.remove(i) {
                            taken.push(parked);
                        }
                    } else {
                        i += 1;
                    }
                }
                taken
            };
            if triggered.is_empty() {
                return outcomes;
            }
            for parked in triggered {
                let converted = convert_triggered(parked.intent);
                trace!(
                    "stop {} triggered at {}, re-injecting as {}",
                    parked.order_id, last_price, converted.kind
                );
                match self.execute_intent(&converted) {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => {
                        trace!("triggered stop {} refused: {}", parked.order_id, err);
                    }
                }
            }
        }
    }

    /// Resolve an intent's kind to an effective limit price, or terminate it
    /// early (parked stop, unpeggable IOC-peg).
    fn resolve_kind(&self, intent: &OrderIntent) -> Result<Resolution, OrderBookError> {
        match intent.kind {
            OrderKind::Market => Ok(Resolution::Execute {
                limit: None,
                tif: intent.tif,
                can_rest: false,
            }),
            OrderKind::Limit => {
                let price = intent.limit_price.ok_or(OrderBookError::MissingLimitPrice {
                    kind: intent.kind,
                })?;
                self.ladder(intent.side).validate_price(price)?;
                Ok(Resolution::Execute {
                    limit: Some(price),
                    tif: intent.tif,
                    can_rest: true,
                })
            }
            OrderKind::Stop => {
                let stop = intent.stop_price.ok_or(OrderBookError::MissingStopPrice {
                    kind: intent.kind,
                })?;
                self.ladder(intent.side).validate_price(stop)?;
                if self.stop_would_trigger(intent) {
                    Ok(Resolution::Execute {
                        limit: None,
                        tif: intent.tif,
                        can_rest: false,
                    })
                } else {
                    Ok(Resolution::Done(self.park_stop(intent)))
                }
            }
            OrderKind::StopLimit => {
                let stop = intent.stop_price.ok_or(OrderBookError::MissingStopPrice {
                    kind: intent.kind,
                })?;
                let price = intent.limit_price.ok_or(OrderBookError::MissingLimitPrice {
                    kind: intent.kind,
                })?;
                self.ladder(intent.side).validate_price(stop)?;
                self.ladder(intent.side).validate_price(price)?;
                if self.stop_would_trigger(intent) {
                    Ok(Resolution::Execute {
                        limit: Some(price),
                        tif: intent.tif,
                        can_rest: true,
                    })
                } else {
                    Ok(Resolution::Done(self.park_stop(intent)))
                }
            }
            OrderKind::IocPeg => {
                match self.best_quote(intent.side.opposite()) {
                    Some(quote) => Ok(Resolution::Execute {
                        limit: Some(quote.price),
                        tif: TimeInForce::Ioc,
                        can_rest: false,
                    }),
                    None => {
                        trace!(
                            "ioc-peg intent {} found no opposite quote",
                            intent.intent_id
                        );
                        let mut outcome = MatchOutcome::new(intent.intent_id, intent.quantity);
                        outcome.state = IntentState::Canceled;
                        Ok(Resolution::Done(outcome))
                    }
                }
            }
        }
    }

    fn stop_would_trigger(&self, intent: &OrderIntent) -> bool {
        match self.last_trade() {
            Some((last_price, _)) => stop_triggered(intent, last_price),
            None => false,
        }
    }

    fn park_stop(&self, intent: &OrderIntent) -> MatchOutcome {
        let order_id = self.next_order_id();
        self.stops.lock().push_back(ParkedStop {
            order_id,
            intent: intent.clone(),
        });
        trace!(
            "parked {} intent {} as {} awaiting trigger",
            intent.kind, intent.intent_id, order_id
        );
        let mut outcome = MatchOutcome::new(intent.intent_id, intent.quantity);
        outcome.state = IntentState::Resting;
        outcome.order_id = Some(order_id);
        outcome
    }

    /// Dry-walk: the crossing quantity an aggressor could actually take,
    /// excluding expired orders and own resting quantity under the active
    /// self-trade policy. Stops early once the requested quantity is
    /// covered.
    fn crossable_quantity(&self, intent: &OrderIntent, limit: Option<u64>, now_ns: u64) -> u64 {
        let opposite = self.ladder(intent.side.opposite());
        let policy = self.self_trade_policy();
        let mut available: u64 = 0;
        let mut blocked = false;
        opposite.walk_from_best(|level| {
            if !intent.side.crosses(limit, level.price()) {
                return false;
            }
            let orders = level.orders();
            for order in orders.iter() {
                if order.tif.is_expired(now_ns) {
                    continue;
                }
                if is_self_match(policy, &intent.client_id, &order.client_id) {
                    if policy.cancels_aggressor() {
                        blocked = true;
                        break;
                    }
                    // cancel-resting removes the own order instead of
                    // trading it, so it contributes nothing either way
                    continue;
                }
                available = available.saturating_add(order.remaining());
                if available >= intent.quantity {
                    break;
                }
            }
            !blocked && available < intent.quantity
        });
        available
    }
}

/// Whether a parked stop triggers at the given last trade price.
fn stop_triggered(intent: &OrderIntent, last_price: u64) -> bool {
    match (intent.side, intent.stop_price) {
        (Side::Buy, Some(stop)) => last_price >= stop,
        (Side::Sell, Some(stop)) => last_price <= stop,
        (_, None) => false,
    }
}

/// Convert a triggered stop into the intent that actually executes.
fn convert_triggered(mut intent: OrderIntent) -> OrderIntent {
    intent.kind = match intent.kind {
        OrderKind::Stop => OrderKind::Market,
        OrderKind::StopLimit => OrderKind::Limit,
        other => other,
    };
    if intent.kind == OrderKind::Market {
        intent.limit_price = None;
    }
    intent
}
