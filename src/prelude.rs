//! Prelude module that re-exports commonly used types and traits.
//!
//! This module provides a convenient way to import the most commonly used
//! types, traits, and functions from the matchcore-rs crate. Instead of
//! importing each type individually, you can use:
//!
//! ```rust
//! use matchcore_rs::prelude::*;
//! ```
//!
//! This will import all the essential types needed for working with the
//! matching core.

// Core domain types
pub use crate::core::{
    EngineConfig, IntentId, IntentState, OrderId, OrderIntent, OrderKind, Side, TimeInForce,
};

// Order book types
pub use crate::orderbook::{
    BestQuote, BookDelta, BookSnapshot, DeltaKind, EnrichedSnapshot, LevelSnapshot, MatchOutcome,
    MetricFlags, ModifyOutcome, OrderBook, OrderBookError, SelfTradePolicy, SnapshotPackage, Trade,
};

// Engine orchestration
pub use crate::engine::{Admission, EngineError, EngineState, MatchingEngine};

// Risk gate types
pub use crate::risk::{BookView, RiskGate, RiskLimits, RiskRejection, Violation, ViolationKind};

// Router types
pub use crate::router::{
    RoutePlan, RouterConfig, RoutingAlgorithm, SmartOrderRouter, VenueDescriptor, VenueKind,
};

// Event fan-out
pub use crate::events::{EngineEvent, EventBus, EventKind, EventPump};

// Ring buffers
pub use crate::ring::{MpscRing, SpscRing};

// Utility functions
pub use crate::utils::{current_time_millis, monotonic_nanos};
