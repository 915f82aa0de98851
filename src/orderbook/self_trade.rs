//! Self-trade handling.
//!
//! When an aggressor would cross a resting order that belongs to the same
//! client, the configured policy decides who yields. Quantity the aggressor
//! skips this way still counts toward an IOC discard and toward a FOK
//! dry-walk shortfall.
//!
//! # Policies
//!
//! - `Allow` — own orders match freely, no checks.
//! - `CancelResting` — the resting order is cancelled and matching continues.
//! - `CancelAggressor` — the aggressor's remainder is discarded at the point
//!   it would cross its own order (default).
//! - `CancelBoth` — the resting order is cancelled and the aggressor's
//!   remainder is discarded.
//!
//! # Bypass
//!
//! Intents with an empty `client_id` (anonymous) always bypass the check,
//! regardless of the configured policy.

use serde::{Deserialize, Serialize};

/// What happens when an aggressor meets its own resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SelfTradePolicy {
    /// No self-trade prevention. Orders from the same client match freely.
    Allow = 0,

    /// Cancel the resting (passive) order and keep matching the aggressor
    /// against the remaining book.
    CancelResting = 1,

    /// Discard the aggressor's remainder when it reaches a same-client
    /// resting order. Resting orders stay in the book.
    #[default]
    CancelAggressor = 2,

    /// Cancel the resting order and discard the aggressor's remainder.
    CancelBoth = 3,
}

impl SelfTradePolicy {
    /// Returns `true` if the policy requires scanning resting owners.
    #[must_use]
    #[inline]
    pub fn is_enabled(self) -> bool {
        self != SelfTradePolicy::Allow
    }

    /// Whether the resting order is removed on a conflict.
    #[must_use]
    #[inline]
    pub fn cancels_resting(self) -> bool {
        matches!(
            self,
            SelfTradePolicy::CancelResting | SelfTradePolicy::CancelBoth
        )
    }

    /// Whether the aggressor's remainder is discarded on a conflict.
    #[must_use]
    #[inline]
    pub fn cancels_aggressor(self) -> bool {
        matches!(
            self,
            SelfTradePolicy::CancelAggressor | SelfTradePolicy::CancelBoth
        )
    }
}

impl std::fmt::Display for SelfTradePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelfTradePolicy::Allow => write!(f, "allow"),
            SelfTradePolicy::CancelResting => write!(f, "cancel-resting"),
            SelfTradePolicy::CancelAggressor => write!(f, "cancel-aggressor"),
            SelfTradePolicy::CancelBoth => write!(f, "cancel-both"),
        }
    }
}

/// Returns `true` when the aggressor and resting owner are the same,
/// non-anonymous client and the policy is active.
#[inline]
pub(crate) fn is_self_match(
    policy: SelfTradePolicy,
    aggressor_client: &str,
    resting_client: &str,
) -> bool {
    policy.is_enabled() && !aggressor_client.is_empty() && aggressor_client == resting_client
}
