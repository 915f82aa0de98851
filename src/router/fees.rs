//! Per-venue fee schedules.

use serde::{Deserialize, Serialize};

/// Maker and taker fees for one venue.
///
/// Fees are expressed in basis points (bps), where 1 bps = 0.01% = 0.0001.
/// Negative values represent rebates (common for maker fees to reward
/// provided liquidity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Maker fee in basis points (negative = rebate).
    pub maker_fee_bps: i32,

    /// Taker fee in basis points. Always positive or zero.
    pub taker_fee_bps: i32,
}

impl FeeSchedule {
    /// Create a new fee schedule.
    #[must_use]
    pub fn new(maker_fee_bps: i32, taker_fee_bps: i32) -> Self {
        Self {
            maker_fee_bps,
            taker_fee_bps,
        }
    }

    /// Fee amount for a transaction of the given notional (price x quantity).
    ///
    /// Positive values are charges, negative values rebates.
    #[must_use]
    #[inline]
    pub fn calculate_fee(&self, notional: u128, is_maker: bool) -> i128 {
        let bps = if is_maker {
            self.maker_fee_bps
        } else {
            self.taker_fee_bps
        };
        (notional as i128)
            .checked_mul(bps as i128)
            .map(|product| product / 10_000)
            .unwrap_or(i128::MAX)
    }

    /// Whether this schedule rebates makers.
    #[must_use]
    #[inline]
    pub fn has_maker_rebate(&self) -> bool {
        self.maker_fee_bps < 0
    }
}
