//! # Low-Latency Matching Core with Pre-Trade Risk and Smart Routing
//!
//! A deterministic limit order book matching engine for building trading systems, together with the two subsystems that sit closest to it in a production deployment: a synchronous pre-trade risk gate and a liquidity-aware smart order router.
//!
//! ## Key Features
//!
//! - **Price-Time Priority Matching**: Aggressors walk the opposite ladder best-price-first; within a price level, resting orders fill in strict FIFO arrival order. Market, limit, stop, stop-limit and IOC-peg intents with GTC, IOC, FOK and GTD time-in-force.
//!
//! - **Integer-Tick Arithmetic**: Prices are integer ticks and quantities integer lots everywhere inside the core. Decimal scaling belongs to the boundary, so matching is bit-for-bit deterministic across runs and platforms.
//!
//! - **Single-Writer Books, Parallel Symbols**: Each symbol's book is mutated by exactly one matching worker. Snapshot readers never block the writer. Symbols run in parallel across a configurable worker pool fed by lock-free SPSC rings behind one MPSC ingress funnel.
//!
//! - **Synchronous Pre-Trade Risk**: Every intent passes an O(1) multi-dimensional gate on the producer thread before it may be queued: halts, order size and value, projected position, exposure, concentration, ring-bucketed order rate, and estimated market impact. The limits table swaps atomically at runtime.
//!
//! - **Smart Order Routing**: TWAP, VWAP, implementation-shortfall and liquidity-seeking allocation across venues, with per-venue fees, reliability, latency and dark-pool participation. Plans carry expected cost, expected impact and a composite risk score.
//!
//! - **Typed Event Fan-Out**: Book deltas, trades, violations, circuit-breaker and lifecycle events publish through bounded lossy channels that never block the matching thread; every subscriber owns its queue and its drop counter.
//!
//! ## Design Goals
//!
//! 1. **Determinism**: A per-book sequence number is the single source of ordering truth; wall-clock timestamps are descriptive only.
//! 2. **Invariant Preservation**: No crossed resting book, conservation of filled quantity, index/ladder agreement and gapless sequence numbering are enforced structurally; a detected violation freezes the book rather than propagating bad state.
//! 3. **Latency**: No allocation on the matching hot path beyond order payloads, cache-line padded queue counters, atomics for every aggregate a reader might poll.
//! 4. **Honest Failure**: Every rejection carries the observed value and the limit it broke; recoverable refusals are returned to the caller and published as violation events.
//!
//! ## Data Flow
//!
//! ```text
//! ingress -> risk gate -> MPSC ring -> dispatcher -> per-symbol SPSC ring
//!         -> matching worker -> book -> deltas/trades -> event fan-out
//! ```
//!
//! Parent orders from strategies pass through the router first; its child
//! allocations re-enter the same admission path as any other intent.
//!
//! ## Quick Start
//!
//! ```rust
//! use matchcore_rs::prelude::*;
//!
//! let book = OrderBook::new("BTC/USD");
//! book.add_limit_order(IntentId(1), Side::Sell, 100, 10, TimeInForce::Gtc)
//!     .unwrap();
//! let outcome = book
//!     .add_limit_order(IntentId(2), Side::Buy, 100, 4, TimeInForce::Gtc)
//!     .unwrap();
//!
//! assert_eq!(outcome.executed_quantity, 4);
//! assert_eq!(book.best_quote(Side::Sell).unwrap().quantity, 6);
//! ```
//!
//! ## Status
//!
//! The core is feature-complete for single-process deployments. Exchange
//! adapters, market-data transport, persistence and recovery tooling are
//! external collaborators and are out of scope for this crate.

pub mod core;
pub mod engine;
pub mod events;
pub mod orderbook;
pub mod prelude;
pub mod ring;
pub mod risk;
pub mod router;
mod utils;

pub use crate::core::{
    EngineConfig, IntentId, IntentState, OrderId, OrderIntent, OrderKind, Side, TimeInForce,
};
pub use engine::{Admission, EngineCommand, EngineError, EngineState, MatchingEngine};
pub use events::{EngineEvent, EventBus, EventKind, EventPump, Subscriber};
pub use orderbook::{
    BestQuote, BookDelta, BookSnapshot, DeltaKind, DeltaListener, EnrichedSnapshot, Ladder,
    LevelSnapshot, MassCancelResult, MatchOutcome, MetricFlags, ModifyOutcome, OrderBook,
    OrderBookError, PriceLevel, RestingOrder, SelfTradePolicy, SnapshotPackage, Trade,
    TradeListener,
};
pub use ring::{MpscRing, RingError, SpscRing};
pub use risk::{
    BookView, BreakerConfig, RiskGate, RiskLimits, RiskRejection, Severity, SymbolLimits,
    Violation, ViolationKind,
};
pub use router::{
    ChildAllocation, FeeSchedule, RoutePlan, RouterConfig, RouterError, RoutingAlgorithm,
    SmartOrderRouter, VenueDescriptor, VenueKind, VenueQuote,
};
pub use utils::{current_time_millis, monotonic_nanos};
