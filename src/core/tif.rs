//! Time-in-force policies.

use serde::{Deserialize, Serialize};

/// How long an order remains eligible for execution.
///
/// `Gtd` carries an absolute expiry in nanoseconds on the engine's monotonic
/// clock; the book's housekeeping scan cancels expired orders at a
/// configured cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-till-cancel: rests until filled or explicitly cancelled.
    #[default]
    Gtc,
    /// Immediate-or-cancel: any unfilled remainder is discarded, never rests.
    Ioc,
    /// Fill-or-kill: executes completely in one matching step or not at all.
    Fok,
    /// Good-till-date: rests until the expiry timestamp (monotonic nanos).
    Gtd {
        /// Absolute expiry on the monotonic clock, in nanoseconds.
        expiry_ns: u64,
    },
}

impl TimeInForce {
    /// Whether an unfilled remainder may rest in the book.
    ///
    /// `Gtd` with an expiry at or before `now_ns` does not rest; it behaves
    /// like `Ioc` for the remainder.
    #[must_use]
    #[inline]
    pub fn allows_resting(self, now_ns: u64) -> bool {
        match self {
            TimeInForce::Gtc => true,
            TimeInForce::Ioc | TimeInForce::Fok => false,
            TimeInForce::Gtd { expiry_ns } => expiry_ns > now_ns,
        }
    }

    /// Whether a resting order with this policy has expired at `now_ns`.
    #[must_use]
    #[inline]
    pub fn is_expired(self, now_ns: u64) -> bool {
        match self {
            TimeInForce::Gtd { expiry_ns } => now_ns >= expiry_ns,
            _ => false,
        }
    }
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
            TimeInForce::Fok => write!(f, "FOK"),
            TimeInForce::Gtd { expiry_ns } => write!(f, "GTD({expiry_ns})"),
        }
    }
}
