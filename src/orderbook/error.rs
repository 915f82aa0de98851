//! Order book error types

use crate::core::{IntentId, OrderId, OrderKind, Side};
use crate::orderbook::self_trade::SelfTradePolicy;
use std::fmt;

/// Errors that can occur within the OrderBook
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OrderBookError {
    /// Order price is not a multiple of the configured tick size
    InvalidTick {
        /// The price that failed validation
        price: u64,
        /// The configured tick size
        tick_size: u64,
    },

    /// Order quantity is not a multiple of the configured lot size
    InvalidLot {
        /// The quantity that failed validation
        quantity: u64,
        /// The configured lot size
        lot_size: u64,
    },

    /// Order quantity must be strictly positive
    NonPositiveQuantity,

    /// The intent kind requires a limit price and none was supplied
    MissingLimitPrice {
        /// The offending intent kind
        kind: OrderKind,
    },

    /// The intent kind requires a stop price and none was supplied
    MissingStopPrice {
        /// The offending intent kind
        kind: OrderKind,
    },

    /// Order not found in the book
    OrderNotFound(OrderId),

    /// A fill-or-kill intent could not be fully matched; no deltas were
    /// emitted and the book is unchanged
    FokUnfillable {
        /// Quantity the intent required
        requested: u64,
        /// Crossing quantity actually available (own resting excluded
        /// under the active self-trade policy)
        available: u64,
    },

    /// The self-trade policy prevented the intent from crossing its own
    /// resting order before any fill occurred
    SelfTradeBlocked {
        /// The policy that was active
        policy: SelfTradePolicy,
        /// The aggressor intent
        intent_id: IntentId,
    },

    /// The book is frozen after an invariant violation; no further intents
    /// are processed until an operator reset
    Frozen {
        /// The affected symbol
        symbol: String,
    },

    /// A fatal internal inconsistency: index/ladder disagreement, negative
    /// remaining quantity, or a crossed resting book
    InvariantViolation {
        /// Human-readable description with full context
        detail: String,
    },

    /// A modify request could not be applied
    InvalidModify {
        /// Description of the rejected change
        message: String,
    },

    /// A resting remainder would cross the opposite side
    PriceCrossing {
        /// Price that would cause crossing
        price: u64,
        /// Side of the order
        side: Side,
        /// Best opposite price
        opposite_price: u64,
    },

    /// Error while serializing snapshot data
    SerializationError {
        /// Underlying error message
        message: String,
    },

    /// Error while deserializing snapshot data
    DeserializationError {
        /// Underlying error message
        message: String,
    },

    /// Snapshot integrity check failed
    ChecksumMismatch {
        /// Expected checksum value
        expected: String,
        /// Actual checksum value
        actual: String,
    },
}

impl fmt::Display for OrderBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBookError::InvalidTick { price, tick_size } => {
                write!(
                    f,
                    "invalid tick: price {price} is not a multiple of tick size {tick_size}"
                )
            }
            OrderBookError::InvalidLot { quantity, lot_size } => {
                write!(
                    f,
                    "invalid lot: quantity {quantity} is not a multiple of lot size {lot_size}"
                )
            }
            OrderBookError::NonPositiveQuantity => {
                write!(f, "quantity must be positive")
            }
            OrderBookError::MissingLimitPrice { kind } => {
                write!(f, "{kind} intent requires a limit price")
            }
            OrderBookError::MissingStopPrice { kind } => {
                write!(f, "{kind} intent requires a stop price")
            }
            OrderBookError::OrderNotFound(id) => write!(f, "order not found: {id}"),
            OrderBookError::FokUnfillable {
                requested,
                available,
            } => {
                write!(
                    f,
                    "fok-unfillable: requested {requested}, available {available}"
                )
            }
            OrderBookError::SelfTradeBlocked { policy, intent_id } => {
                write!(f, "self-trade blocked ({policy}): intent {intent_id}")
            }
            OrderBookError::Frozen { symbol } => {
                write!(f, "book {symbol} is frozen pending operator recovery")
            }
            OrderBookError::InvariantViolation { detail } => {
                write!(f, "invariant violation: {detail}")
            }
            OrderBookError::InvalidModify { message } => {
                write!(f, "invalid modify: {message}")
            }
            OrderBookError::PriceCrossing {
                price,
                side,
                opposite_price,
            } => {
                write!(
                    f,
                    "price crossing: {side} {price} would cross opposite at {opposite_price}"
                )
            }
            OrderBookError::SerializationError { message } => {
                write!(f, "serialization error: {message}")
            }
            OrderBookError::DeserializationError { message } => {
                write!(f, "deserialization error: {message}")
            }
            OrderBookError::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected}, but computed {actual}"
                )
            }
        }
    }
}

impl std::error::Error for OrderBookError {}
