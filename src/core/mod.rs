//! Fundamental domain types shared by every subsystem: sides, time-in-force
//! policies, order kinds, identifiers, order intents and the engine
//! configuration.

mod config;
mod ids;
mod intent;
mod side;
mod tif;

pub use config::EngineConfig;
pub use ids::{IntentId, OrderId, TradeIdGenerator};
pub use intent::{IntentState, OrderIntent, OrderKind};
pub use side::Side;
pub use tif::TimeInForce;
