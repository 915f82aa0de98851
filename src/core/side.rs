//! Order book side.

use serde::{Deserialize, Serialize};

/// The side of an order or book ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy (bid) side.
    Buy = 0,
    /// Sell (ask) side.
    Sell = 1,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Returns `true` if an aggressor on this side crosses the given resting
    /// price at its limit. A `None` limit is a market order and crosses
    /// everything.
    #[must_use]
    #[inline]
    pub fn crosses(self, limit: Option<u64>, resting_price: u64) -> bool {
        match (self, limit) {
            (_, None) => true,
            (Side::Buy, Some(limit)) => resting_price <= limit,
            (Side::Sell, Some(limit)) => resting_price >= limit,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}
