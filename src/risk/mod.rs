//! Pre-trade risk: the synchronous gate every intent passes before it may
//! reach matching, plus the state it consults (limits, positions, rate
//! counters and circuit breakers).

mod circuit;
mod gate;
mod limits;
mod position;
mod rate;
mod violation;

pub use circuit::{BreakerConfig, CircuitBreakerBank};
pub use gate::{BookView, RiskGate};
pub use limits::{RiskLimits, SymbolLimits};
pub use position::PositionBook;
pub use rate::{RateWindow, RateWindowCounters};
pub use violation::{
    ActionTaken, RiskRejection, Severity, Violation, ViolationKind, ViolationListener,
};
