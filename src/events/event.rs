//! The closed set of events the engine publishes.

use crate::orderbook::{BookDelta, Trade};
use crate::risk::{RiskLimits, Violation};
use serde::{Deserialize, Serialize};

/// Event kinds, used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// An atomic book state change.
    BookDelta,
    /// A fill.
    Trade,
    /// A risk limit breach.
    Violation,
    /// A circuit breaker tripped or re-armed.
    CircuitBreaker,
    /// The limits table was swapped.
    LimitUpdate,
    /// The emergency stop was engaged or released.
    EmergencyStop,
    /// Periodic risk metrics.
    RiskMetricsUpdate,
    /// A book froze after an invariant violation.
    Fatal,
}

/// An event published through the fan-out.
///
/// Payloads are closed tagged variants; there is no open metadata bag, every
/// field has a precise type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// An atomic book state change.
    BookDelta(BookDelta),
    /// A fill.
    Trade(Trade),
    /// A risk limit breach.
    Violation(Violation),
    /// A circuit breaker tripped.
    CircuitBreaker {
        /// The halted symbol.
        symbol: String,
        /// Cooldown applied, in milliseconds.
        cooldown_ms: u64,
        /// Wall-clock timestamp in milliseconds.
        timestamp_ms: u64,
    },
    /// The limits table was swapped.
    LimitUpdate {
        /// The new active table.
        limits: RiskLimits,
        /// Wall-clock timestamp in milliseconds.
        timestamp_ms: u64,
    },
    /// The emergency stop changed state.
    EmergencyStop {
        /// True when engaged.
        engaged: bool,
        /// Wall-clock timestamp in milliseconds.
        timestamp_ms: u64,
    },
    /// Periodic risk metrics.
    RiskMetricsUpdate {
        /// Current gross exposure.
        gross_exposure: f64,
        /// Running daily realized P&L.
        daily_realized_pnl: f64,
        /// Wall-clock timestamp in milliseconds.
        timestamp_ms: u64,
    },
    /// A book froze after an invariant violation. Operator recovery required.
    Fatal {
        /// The frozen symbol.
        symbol: String,
        /// Full violation context.
        detail: String,
        /// Wall-clock timestamp in milliseconds.
        timestamp_ms: u64,
    },
}

impl EngineEvent {
    /// The kind used for subscription filtering.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::BookDelta(_) => EventKind::BookDelta,
            EngineEvent::Trade(_) => EventKind::Trade,
            EngineEvent::Violation(_) => EventKind::Violation,
            EngineEvent::CircuitBreaker { .. } => EventKind::CircuitBreaker,
            EngineEvent::LimitUpdate { .. } => EventKind::LimitUpdate,
            EngineEvent::EmergencyStop { .. } => EventKind::EmergencyStop,
            EngineEvent::RiskMetricsUpdate { .. } => EventKind::RiskMetricsUpdate,
            EngineEvent::Fatal { .. } => EventKind::Fatal,
        }
    }

    /// The symbol this event concerns, when it is symbol-scoped. Engine-wide
    /// events (limit updates, emergency stop, risk metrics) have none.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            EngineEvent::BookDelta(delta) => Some(delta.symbol.as_str()),
            EngineEvent::Trade(trade) => Some(trade.symbol.as_str()),
            EngineEvent::Violation(violation) => violation.symbol.as_deref(),
            EngineEvent::CircuitBreaker { symbol, .. } | EngineEvent::Fatal { symbol, .. } => {
                Some(symbol.as_str())
            }
            EngineEvent::LimitUpdate { .. }
            | EngineEvent::EmergencyStop { .. }
            | EngineEvent::RiskMetricsUpdate { .. } => None,
        }
    }
}
