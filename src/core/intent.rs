//! Order intents: requests to add liquidity or take it.

use super::ids::IntentId;
use super::side::Side;
use super::tif::TimeInForce;
use serde::{Deserialize, Serialize};

/// The kind of an order intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Execute immediately at any price; never rests.
    Market,
    /// Execute at `limit_price` or better; remainder may rest.
    Limit,
    /// Parked until the last trade price reaches `stop_price`, then becomes
    /// a market order.
    Stop,
    /// Parked until the last trade price reaches `stop_price`, then becomes
    /// a limit order at `limit_price`.
    StopLimit,
    /// Pegged to the opposite best at admission time with IOC semantics.
    IocPeg,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "Market"),
            OrderKind::Limit => write!(f, "Limit"),
            OrderKind::Stop => write!(f, "Stop"),
            OrderKind::StopLimit => write!(f, "StopLimit"),
            OrderKind::IocPeg => write!(f, "IocPeg"),
        }
    }
}

/// Lifecycle state of an intent as it moves through the engine.
///
/// `Resting`, `Filled`, `Canceled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    /// Created by the client, not yet validated.
    Received,
    /// Admitted by the risk gate, queued for matching.
    Validated,
    /// Being matched against the opposite ladder.
    Matching,
    /// Remainder accepted into the book as a resting order.
    Resting,
    /// Fully consumed by trades.
    Filled,
    /// Removed before completion (explicit cancel, IOC discard, expiry).
    Canceled,
    /// Refused by validation, the risk gate, or the matcher (FOK shortfall).
    Rejected,
}

impl IntentState {
    /// Whether this state admits no further transitions.
    #[must_use]
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IntentState::Resting
                | IntentState::Filled
                | IntentState::Canceled
                | IntentState::Rejected
        )
    }
}

/// A request to add, take, or peg liquidity on one symbol.
///
/// Prices are integer ticks and quantities integer lots; decimal scaling
/// happens at the boundary that produced the intent. `arrival_ns` is stamped
/// from the engine's monotonic clock at admission and is descriptive only;
/// the per-book sequence number is the ordering truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Engine-assigned id, set at admission.
    pub intent_id: IntentId,
    /// Identity of the submitting client.
    pub client_id: String,
    /// Client-chosen opaque id, used for idempotent replay detection.
    pub client_order_id: String,
    /// Trading symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// Market, limit, stop, stop-limit or IOC-peg.
    pub kind: OrderKind,
    /// Time-in-force policy.
    pub tif: TimeInForce,
    /// Quantity in lots. Must be positive.
    pub quantity: u64,
    /// Limit price in ticks. Required for `Limit` and `StopLimit`.
    pub limit_price: Option<u64>,
    /// Stop trigger price in ticks. Required for `Stop` and `StopLimit`.
    pub stop_price: Option<u64>,
    /// Originating strategy.
    pub strategy_id: String,
    /// Monotonic arrival timestamp in nanoseconds.
    pub arrival_ns: u64,
}

impl OrderIntent {
    /// Build a limit intent with the common fields filled in.
    pub fn limit(
        symbol: &str,
        side: Side,
        price: u64,
        quantity: u64,
        tif: TimeInForce,
    ) -> Self {
        Self {
            intent_id: IntentId::default(),
            client_id: String::new(),
            client_order_id: String::new(),
            symbol: symbol.to_string(),
            side,
            kind: OrderKind::Limit,
            tif,
            quantity,
            limit_price: Some(price),
            stop_price: None,
            strategy_id: String::new(),
            arrival_ns: 0,
        }
    }

    /// Build a market intent.
    pub fn market(symbol: &str, side: Side, quantity: u64) -> Self {
        Self {
            intent_id: IntentId::default(),
            client_id: String::new(),
            client_order_id: String::new(),
            symbol: symbol.to_string(),
            side,
            kind: OrderKind::Market,
            tif: TimeInForce::Ioc,
            quantity,
            limit_price: None,
            stop_price: None,
            strategy_id: String::new(),
            arrival_ns: 0,
        }
    }

    /// Attach a client identity and client order id.
    #[must_use]
    pub fn with_client(mut self, client_id: &str, client_order_id: &str) -> Self {
        self.client_id = client_id.to_string();
        self.client_order_id = client_order_id.to_string();
        self
    }

    /// Notional value in tick-lots, when a limit price is present.
    #[must_use]
    #[inline]
    pub fn notional(&self) -> Option<u128> {
        self.limit_price
            .map(|price| (price as u128).saturating_mul(self.quantity as u128))
    }
}
