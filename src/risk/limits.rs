//! The risk limits table.
//!
//! The active table lives behind an atomic swap in the gate: checks read a
//! consistent snapshot for their whole run, and `update_limits` replaces the
//! table without ever exposing a mix of old and new values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Limits that apply to a single symbol, overriding the global caps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolLimits {
    /// Per-order quantity cap for this symbol.
    pub max_order_size: Option<u64>,
    /// Absolute net position cap for this symbol.
    pub max_position: Option<i64>,
}

/// The multi-dimensional limits the pre-trade gate enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Per-order quantity cap in lots.
    pub max_order_size: u64,
    /// Per-order notional cap in tick-lots.
    pub max_order_value: u128,
    /// Absolute net position cap in lots, any symbol.
    pub max_position: i64,
    /// Daily realized loss that engages the drawdown response.
    pub max_daily_loss: f64,
    /// Largest position value as a share of gross exposure, in [0, 1].
    pub max_concentration: f64,
    /// Gross leverage cap.
    pub max_leverage: f64,
    /// Estimated market impact cap in basis points.
    pub max_market_impact_bps: f64,
    /// Value-at-risk cap.
    pub var_limit: f64,
    /// Gross exposure cap across all symbols.
    pub max_portfolio_value: f64,
    /// Admitted orders per sliding second.
    pub max_orders_per_second: u32,
    /// Admitted orders per sliding minute.
    pub max_orders_per_minute: u32,
    /// Per-symbol overrides.
    pub per_symbol: BTreeMap<String, SymbolLimits>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_order_size: 10_000,
            max_order_value: 10_000_000,
            max_position: 100_000,
            max_daily_loss: 1_000_000.0,
            max_concentration: 0.25,
            max_leverage: 10.0,
            max_market_impact_bps: 10_000.0,
            var_limit: 500_000.0,
            max_portfolio_value: 100_000_000.0,
            max_orders_per_second: 100,
            max_orders_per_minute: 2_000,
            per_symbol: BTreeMap::new(),
        }
    }
}

impl RiskLimits {
    /// Effective per-order size cap for a symbol.
    #[must_use]
    pub fn order_size_cap(&self, symbol: &str) -> u64 {
        self.per_symbol
            .get(symbol)
            .and_then(|s| s.max_order_size)
            .map_or(self.max_order_size, |cap| cap.min(self.max_order_size))
    }

    /// Effective absolute position cap for a symbol.
    #[must_use]
    pub fn position_cap(&self, symbol: &str) -> i64 {
        self.per_symbol
            .get(symbol)
            .and_then(|s| s.max_position)
            .map_or(self.max_position, |cap| cap.min(self.max_position))
    }
}
