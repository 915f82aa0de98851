//! The synchronous pre-trade gate.
//!
//! Runs on the producer thread, in the ingress path, before an intent may
//! be queued for matching. Checks are applied in a fixed order with
//! short-circuit and each one is O(1): the limits table is read once as an
//! atomic snapshot, positions and exposure are pre-aggregated, and the rate
//! counters are ring-bucketed.

use super::circuit::{BreakerConfig, CircuitBreakerBank};
use super::limits::RiskLimits;
use super::position::PositionBook;
use super::rate::RateWindowCounters;
use super::violation::{
    ActionTaken, RiskRejection, Severity, Violation, ViolationKind, ViolationListener,
};
use crate::core::{OrderIntent, Side};
use crate::utils::current_time_millis;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// What the gate needs to know about the target book for one check.
///
/// Produced by the engine from the book's lock-free aggregates; the gate
/// itself never touches a book.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookView {
    /// Mark price for the symbol, in ticks.
    pub mark_price: Option<u64>,
    /// Visible opposite-side liquidity, in lots.
    pub opposite_visible: u64,
    /// Whether the intent would take liquidity immediately.
    pub crossing: bool,
}

/// The pre-trade risk gate.
pub struct RiskGate {
    limits: ArcSwap<RiskLimits>,
    positions: PositionBook,
    rates: DashMap<String, RateWindowCounters>,
    breakers: CircuitBreakerBank,
    emergency_stop: AtomicBool,
    auto_stop_on_violation: bool,
    violation_listener: Option<ViolationListener>,
}

impl RiskGate {
    /// Create a gate with the given initial limits and breaker thresholds.
    pub fn new(limits: RiskLimits, breakers: BreakerConfig, auto_stop_on_violation: bool) -> Self {
        Self {
            limits: ArcSwap::from_pointee(limits),
            positions: PositionBook::new(),
            rates: DashMap::new(),
            breakers: CircuitBreakerBank::new(breakers),
            emergency_stop: AtomicBool::new(false),
            auto_stop_on_violation,
            violation_listener: None,
        }
    }

    /// Attach a violation listener, consuming the gate.
    #[must_use]
    pub fn with_violation_listener(mut self, listener: ViolationListener) -> Self {
        self.violation_listener = Some(listener);
        self
    }

    /// Validate one intent. Returns `Ok(())` to admit.
    ///
    /// Checks run in order with short-circuit: halts, order size and value,
    /// projected position, exposure, concentration, order rate, market
    /// impact, breaker re-check. Every rejection also publishes a violation
    /// record.
    ///
    /// # Errors
    /// The first failed check's [`RiskRejection`].
    pub fn check(&self, intent: &OrderIntent, view: BookView) -> Result<(), RiskRejection> {
        let now_ms = current_time_millis();
        self.check_inner(intent, view, now_ms)
            .inspect_err(|rejection| self.publish_rejection(rejection, &intent.symbol, now_ms))
    }

    fn check_inner(
        &self,
        intent: &OrderIntent,
        view: BookView,
        now_ms: u64,
    ) -> Result<(), RiskRejection> {
        // 1. Global halts.
        if self.emergency_stop.load(Ordering::Acquire) {
            return Err(RiskRejection::EmergencyStop);
        }
        if let Some(remaining_ms) = self.breakers.tripped_remaining_ms(&intent.symbol, now_ms) {
            return Err(RiskRejection::CircuitBreaker {
                symbol: intent.symbol.clone(),
                remaining_ms,
            });
        }

        let limits = self.limits.load();

        // 2. Order size, value and per-symbol caps.
        if intent.quantity == 0 {
            return Err(RiskRejection::InvalidQuantity {
                quantity: intent.quantity,
            });
        }
        if intent.quantity > limits.max_order_size {
            return Err(RiskRejection::OrderSize {
                observed: intent.quantity,
                limit: limits.max_order_size,
            });
        }
        let symbol_cap = limits.order_size_cap(&intent.symbol);
        if intent.quantity > symbol_cap {
            return Err(RiskRejection::SymbolCap {
                symbol: intent.symbol.clone(),
                observed: intent.quantity,
                limit: symbol_cap,
            });
        }
        if let Some(notional) = intent.notional()
            && notional > limits.max_order_value
        {
            return Err(RiskRejection::OrderValue {
                observed: notional,
                limit: limits.max_order_value,
            });
        }

        // 3. Projected position.
        let current = self.positions.net_position(&intent.symbol);
        let projected = match intent.side {
            Side::Buy => current.saturating_add(intent.quantity as i64),
            Side::Sell => current.saturating_sub(intent.quantity as i64),
        };
        let position_cap = limits.position_cap(&intent.symbol);
        if projected.abs() > position_cap {
            return Err(RiskRejection::Position {
                symbol: intent.symbol.clone(),
                projected,
                limit: position_cap,
            });
        }

        // 4. Projected gross exposure.
        let mark = view
            .mark_price
            .or_else(|| self.positions.mark_price(&intent.symbol))
            .or(intent.limit_price)
            .unwrap_or(0) as f64;
        let projected_symbol_value = projected.unsigned_abs() as f64 * mark;
        let current_symbol_value =
            current.unsigned_abs() as f64 * self.positions.mark_price(&intent.symbol).unwrap_or(0) as f64;
        let projected_exposure =
            self.positions.gross_exposure() - current_symbol_value + projected_symbol_value;
        if projected_exposure > limits.max_portfolio_value {
            return Err(RiskRejection::Exposure {
                projected: projected_exposure,
                limit: limits.max_portfolio_value,
            });
        }

        // 5. Concentration. Only meaningful once other symbols carry
        // exposure; a one-symbol portfolio is always at 100%.
        if projected_exposure > projected_symbol_value {
            let largest = self
                .positions
                .largest_position_value()
                .max(projected_symbol_value);
            let concentration = largest / projected_exposure;
            if concentration > limits.max_concentration {
                return Err(RiskRejection::Concentration {
                    projected: concentration,
                    limit: limits.max_concentration,
                });
            }
        }

        // 6. Order rate, keyed by client.
        let counters = self
            .rates
            .entry(intent.client_id.clone())
            .or_default();
        if let Err((window, observed, limit)) = counters.try_admit(
            now_ms / 1_000,
            limits.max_orders_per_second,
            limits.max_orders_per_minute,
        ) {
            return Err(RiskRejection::OrderRate {
                window,
                observed,
                limit,
            });
        }
        drop(counters);

        // 7. Estimated market impact, for liquidity-taking intents only.
        if view.crossing {
            let ratio = intent.quantity as f64 / view.opposite_visible.max(1) as f64;
            let estimated_bps = ratio * ratio * 10_000.0;
            if estimated_bps > limits.max_market_impact_bps {
                return Err(RiskRejection::MarketImpact {
                    estimated_bps,
                    limit_bps: limits.max_market_impact_bps,
                });
            }
        }

        // 8. Breaker inputs may have tripped while this check ran.
        if let Some(remaining_ms) = self.breakers.tripped_remaining_ms(&intent.symbol, now_ms) {
            return Err(RiskRejection::CircuitBreaker {
                symbol: intent.symbol.clone(),
                remaining_ms,
            });
        }

        Ok(())
    }

    /// Atomically replace the active limits table.
    ///
    /// Checks in flight see the old table or the new one, never a mix.
    pub fn update_limits(&self, limits: RiskLimits) {
        info!("risk limits table swapped");
        self.limits.store(Arc::new(limits));
    }

    /// A consistent snapshot of the active limits table.
    #[must_use]
    pub fn limits(&self) -> Arc<RiskLimits> {
        self.limits.load_full()
    }

    /// Engage or release the engine-wide kill switch.
    pub fn set_emergency_stop(&self, engaged: bool) {
        if engaged {
            warn!("emergency stop engaged");
        } else {
            info!("emergency stop released");
        }
        self.emergency_stop.store(engaged, Ordering::Release);
    }

    /// Whether the kill switch is engaged.
    #[must_use]
    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stop.load(Ordering::Acquire)
    }

    /// Feed a fill: updates positions, exposure and breaker inputs.
    pub fn on_fill(&self, symbol: &str, aggressor_side: Side, quantity: u64, price: u64) {
        self.positions
            .apply_fill(symbol, aggressor_side, quantity, price);
        let now_ms = current_time_millis();
        if self.breakers.observe_trade(symbol, price, quantity, now_ms) {
            self.publish(Violation {
                kind: ViolationKind::CircuitBreaker,
                severity: Severity::Critical,
                symbol: Some(symbol.to_string()),
                observed: price as f64,
                limit: self.breakers.config().price_change_threshold_bps as f64,
                action: ActionTaken::BreakerTripped,
                timestamp_ms: now_ms,
            });
        }
    }

    /// Apply a realized P&L delta from post-trade.
    ///
    /// Drawdown is not checked per intent; it is enforced here, and with
    /// `auto_stop_on_violation` a breach engages the emergency stop.
    pub fn on_pnl_update(&self, realized_delta: f64) {
        let total = self.positions.record_realized_pnl(realized_delta);
        let limits = self.limits.load();
        if total < -limits.max_daily_loss {
            let action = if self.auto_stop_on_violation {
                self.set_emergency_stop(true);
                ActionTaken::EmergencyStopped
            } else {
                ActionTaken::Rejected
            };
            self.publish(Violation {
                kind: ViolationKind::Drawdown,
                severity: Severity::Critical,
                symbol: None,
                observed: total,
                limit: -limits.max_daily_loss,
                action,
                timestamp_ms: current_time_millis(),
            });
        }
    }

    /// Update a symbol's mark price.
    pub fn set_mark_price(&self, symbol: &str, price: u64) {
        self.positions.set_mark_price(symbol, price);
    }

    /// The gate's position book.
    #[must_use]
    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    /// The gate's circuit breaker bank.
    #[must_use]
    pub fn breakers(&self) -> &CircuitBreakerBank {
        &self.breakers
    }

    fn publish_rejection(&self, rejection: &RiskRejection, symbol: &str, now_ms: u64) {
        let (observed, limit) = rejection.observed_and_limit();
        let severity = match rejection {
            RiskRejection::EmergencyStop | RiskRejection::CircuitBreaker { .. } => {
                Severity::Critical
            }
            _ => Severity::Warning,
        };
        self.publish(Violation {
            kind: rejection.kind(),
            severity,
            symbol: Some(symbol.to_string()),
            observed,
            limit,
            action: ActionTaken::Rejected,
            timestamp_ms: now_ms,
        });
    }

    fn publish(&self, violation: Violation) {
        if let Some(listener) = &self.violation_listener {
            listener(&violation);
        }
    }
}
