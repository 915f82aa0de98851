//! Allocation plans produced by the router.

use super::allocator::RoutingAlgorithm;
use crate::core::{OrderKind, TimeInForce};
use serde::{Deserialize, Serialize};

/// One child order the plan sends to a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildAllocation {
    /// Destination venue.
    pub venue_id: String,
    /// Quantity in lots.
    pub quantity: u64,
    /// Price the allocation expects to execute at, in ticks.
    pub expected_price: u64,
    /// Send order; lower goes first.
    pub priority: u32,
    /// Effective order kind for the child.
    pub kind: OrderKind,
    /// Effective time-in-force for the child. Dark allocations use IOC.
    pub tif: TimeInForce,
}

/// A complete venue allocation for one parent order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// The algorithm that produced this plan.
    pub algorithm: RoutingAlgorithm,
    /// Child allocations in priority order.
    pub allocations: Vec<ChildAllocation>,
    /// Sum of quantity x expected price over the allocations.
    pub expected_cost: u128,
    /// Estimated market impact of executing the plan, in basis points.
    pub expected_impact_bps: f64,
    /// Expected slippage of the average fill against the best available
    /// price, in basis points.
    pub expected_slippage_bps: f64,
    /// Composite risk score in [0, 1]: venue fan-out, size and the
    /// largest-allocation concentration.
    pub risk_score: f64,
    /// False when the expected impact exceeds the configured cap; an
    /// unapproved plan must be rejected upstream.
    pub approved: bool,
    /// Parent quantity the plan could not place.
    pub unallocated: u64,
}

impl RoutePlan {
    /// Total quantity placed across all allocations.
    #[must_use]
    pub fn allocated_quantity(&self) -> u64 {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    /// Quantity-weighted average expected price, if anything was allocated.
    #[must_use]
    pub fn average_expected_price(&self) -> Option<f64> {
        let quantity = self.allocated_quantity();
        if quantity == 0 {
            None
        } else {
            Some(self.expected_cost as f64 / quantity as f64)
        }
    }
}
