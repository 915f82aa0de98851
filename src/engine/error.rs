//! Engine-level errors.

use crate::orderbook::OrderBookError;
use crate::ring::RingError;
use crate::risk::RiskRejection;
use thiserror::Error;

/// Errors surfaced to ingress callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The risk gate refused the intent.
    #[error("risk rejected: {0}")]
    Risk(#[from] RiskRejection),

    /// The book refused or failed the operation.
    #[error(transparent)]
    Book(#[from] OrderBookError),

    /// The ingress queue is full; retry or shed load.
    #[error("back-pressure: ingress queue full")]
    BackPressure,

    /// The engine is draining or stopped.
    #[error("shutting-down")]
    ShuttingDown,

    /// No book exists for the symbol.
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    /// The client order id was already accepted; replays of accepted
    /// intents are refused rather than re-executed.
    #[error("duplicate client order id {0}")]
    DuplicateIntent(String),

    /// A ring buffer could not be constructed.
    #[error(transparent)]
    Ring(#[from] RingError),
}
