//! Violation records and risk rejection reasons.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// The taxonomy of risk and halt refusals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Quantity above the per-order cap.
    OrderSize,
    /// Notional above the per-order value cap.
    OrderValue,
    /// Projected net position above the cap.
    Position,
    /// Projected gross exposure above the portfolio cap.
    Exposure,
    /// Largest position too big relative to total exposure.
    Concentration,
    /// Order-rate window cap exceeded.
    OrderRate,
    /// Estimated market impact above the cap.
    MarketImpact,
    /// Daily loss limit breached.
    Drawdown,
    /// Value-at-risk limit breached.
    VaR,
    /// Leverage limit breached.
    Leverage,
    /// Engine-wide emergency stop engaged.
    EmergencyStop,
    /// Symbol circuit breaker tripped.
    CircuitBreaker,
    /// Engine draining or stopped.
    Shutdown,
    /// Bad tick, bad lot, non-positive quantity or unknown symbol.
    InvalidIntent,
    /// A fill-or-kill intent could not be fully matched.
    FokUnfillable,
    /// The self-trade policy blocked a cross.
    SelfTradeBlocked,
    /// Ingress queue full.
    BackPressure,
}

/// How serious a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Informational; no action beyond the rejection.
    Info,
    /// The rejection is expected to recur without intervention.
    Warning,
    /// Trading was halted or should be.
    Critical,
}

/// What the gate did about a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTaken {
    /// The intent was rejected.
    Rejected,
    /// The gate engaged the emergency stop.
    EmergencyStopped,
    /// A symbol circuit breaker was tripped.
    BreakerTripped,
}

/// A record of one limit breach, published to the event fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Which limit was breached.
    pub kind: ViolationKind,
    /// How serious the breach is.
    pub severity: Severity,
    /// The symbol involved, when the breach is symbol-scoped.
    pub symbol: Option<String>,
    /// The observed value that breached the limit.
    pub observed: f64,
    /// The limit it breached.
    pub limit: f64,
    /// What the gate did.
    pub action: ActionTaken,
    /// Wall-clock timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// A thread-safe listener callback for violation records.
pub type ViolationListener = Arc<dyn Fn(&Violation) + Send + Sync>;

/// A refusal from the pre-trade risk gate.
///
/// Every variant carries the observed value and the limit it breached, so a
/// client can see exactly why it was refused.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RiskRejection {
    /// The engine-wide kill switch is engaged.
    #[error("halted: emergency stop engaged")]
    EmergencyStop,

    /// The symbol's circuit breaker is inside its cooldown window.
    #[error("halted: circuit breaker on {symbol}, {remaining_ms} ms of cooldown left")]
    CircuitBreaker {
        /// The halted symbol.
        symbol: String,
        /// Milliseconds until the breaker re-arms.
        remaining_ms: u64,
    },

    /// Quantity must be positive and on the lot grid.
    #[error("invalid quantity {quantity}")]
    InvalidQuantity {
        /// The refused quantity.
        quantity: u64,
    },

    /// Quantity above the per-order cap.
    #[error("order size {observed} exceeds limit {limit}")]
    OrderSize {
        /// Requested quantity.
        observed: u64,
        /// Active cap.
        limit: u64,
    },

    /// Notional above the per-order value cap.
    #[error("order value {observed} exceeds limit {limit}")]
    OrderValue {
        /// Requested notional (ticks x lots).
        observed: u128,
        /// Active cap.
        limit: u128,
    },

    /// Quantity above the symbol-specific cap.
    #[error("order size {observed} exceeds {symbol} cap {limit}")]
    SymbolCap {
        /// The capped symbol.
        symbol: String,
        /// Requested quantity.
        observed: u64,
        /// Active cap.
        limit: u64,
    },

    /// Projected net position above the cap.
    #[error("projected position {projected} on {symbol} exceeds limit {limit}")]
    Position {
        /// The symbol.
        symbol: String,
        /// Projected signed position.
        projected: i64,
        /// Absolute cap.
        limit: i64,
    },

    /// Projected gross exposure above the portfolio cap.
    #[error("projected exposure {projected:.2} exceeds limit {limit:.2}")]
    Exposure {
        /// Projected gross exposure.
        projected: f64,
        /// Active cap.
        limit: f64,
    },

    /// Largest position too concentrated.
    #[error("projected concentration {projected:.4} exceeds limit {limit:.4}")]
    Concentration {
        /// Projected largest-position share of exposure.
        projected: f64,
        /// Active cap in [0, 1].
        limit: f64,
    },

    /// Order-rate cap exceeded in a sliding window.
    #[error("order rate {observed} exceeds {window} limit {limit}")]
    OrderRate {
        /// The window that overflowed.
        window: super::RateWindow,
        /// Orders observed in the window, including this one.
        observed: u32,
        /// Active cap.
        limit: u32,
    },

    /// Estimated market impact above the cap.
    #[error("estimated impact {estimated_bps:.1} bps exceeds limit {limit_bps:.1} bps")]
    MarketImpact {
        /// Estimated impact in basis points.
        estimated_bps: f64,
        /// Active cap in basis points.
        limit_bps: f64,
    },
}

impl RiskRejection {
    /// The violation kind this rejection maps to.
    #[must_use]
    pub fn kind(&self) -> ViolationKind {
        match self {
            RiskRejection::EmergencyStop => ViolationKind::EmergencyStop,
            RiskRejection::CircuitBreaker { .. } => ViolationKind::CircuitBreaker,
            RiskRejection::InvalidQuantity { .. } | RiskRejection::OrderSize { .. } => {
                ViolationKind::OrderSize
            }
            RiskRejection::OrderValue { .. } => ViolationKind::OrderValue,
            RiskRejection::SymbolCap { .. } => ViolationKind::OrderSize,
            RiskRejection::Position { .. } => ViolationKind::Position,
            RiskRejection::Exposure { .. } => ViolationKind::Exposure,
            RiskRejection::Concentration { .. } => ViolationKind::Concentration,
            RiskRejection::OrderRate { .. } => ViolationKind::OrderRate,
            RiskRejection::MarketImpact { .. } => ViolationKind::MarketImpact,
        }
    }

    /// Observed value and limit for the violation record.
    #[must_use]
    pub fn observed_and_limit(&self) -> (f64, f64) {
        match self {
            RiskRejection::EmergencyStop => (1.0, 0.0),
            RiskRejection::CircuitBreaker { remaining_ms, .. } => (*remaining_ms as f64, 0.0),
            RiskRejection::InvalidQuantity { quantity } => (*quantity as f64, 0.0),
            RiskRejection::OrderSize { observed, limit } => (*observed as f64, *limit as f64),
            RiskRejection::OrderValue { observed, limit } => (*observed as f64, *limit as f64),
            RiskRejection::SymbolCap {
                observed, limit, ..
            } => (*observed as f64, *limit as f64),
            RiskRejection::Position {
                projected, limit, ..
            } => (*projected as f64, *limit as f64),
            RiskRejection::Exposure { projected, limit } => (*projected, *limit),
            RiskRejection::Concentration { projected, limit } => (*projected, *limit),
            RiskRejection::OrderRate {
                observed, limit, ..
            } => (*observed as f64, *limit as f64),
            RiskRejection::MarketImpact {
                estimated_bps,
                limit_bps,
            } => (*estimated_bps, *limit_bps),
        }
    }
}
