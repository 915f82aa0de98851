//! Allocation algorithms for the smart order router.
//!
//! Every algorithm first narrows the candidate set the same way: connected
//! venues whose quote is fresh inside the cache timeout, whose reliability
//! meets the floor, and whose size band fits the parent order. Tie-breaks
//! between equally priced venues are deterministic: higher reliability, then
//! lower average latency, then higher historical fill rate, stable within
//! full ties.

use super::plan::{ChildAllocation, RoutePlan};
use super::venue::VenueDescriptor;
use crate::core::{OrderIntent, OrderKind, Side, TimeInForce};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::{debug, trace};

/// Which allocation algorithm the router runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingAlgorithm {
    /// Greedy best-price allocation.
    #[default]
    Twap,
    /// Volume-weighted proportional allocation.
    Vwap,
    /// Implementation shortfall: price plus impact cost.
    #[serde(rename = "is")]
    ImplementationShortfall,
    /// Dark pools first, then TWAP across lit venues.
    LiquiditySeeking,
}

impl std::fmt::Display for RoutingAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingAlgorithm::Twap => write!(f, "twap"),
            RoutingAlgorithm::Vwap => write!(f, "vwap"),
            RoutingAlgorithm::ImplementationShortfall => write!(f, "is"),
            RoutingAlgorithm::LiquiditySeeking => write!(f, "liquidity-seeking"),
        }
    }
}

/// Router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The algorithm to run.
    pub algorithm: RoutingAlgorithm,
    /// Whether dark pools may receive allocations.
    pub enable_dark_pools: bool,
    /// Share of the parent quantity the dark phase may take, in [0, 1].
    pub dark_participation: f64,
    /// Maximum venues per parent order.
    pub max_venues_per_order: usize,
    /// Smallest allocation worth sending, in lots.
    pub min_venue_size: u64,
    /// Reliability floor for candidate venues, in [0, 1].
    pub min_reliability: f64,
    /// Maximum age of a venue quote, in milliseconds.
    pub cache_timeout_ms: u64,
    /// Slippage target in basis points, used by cost reporting.
    pub slippage_target_bps: f64,
    /// Expected-impact cap in basis points; plans above it are not approved.
    pub max_market_impact_bps: f64,
    /// Coefficient `k` of the quadratic impact estimate, in basis points.
    pub impact_coefficient_bps: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            algorithm: RoutingAlgorithm::Twap,
            enable_dark_pools: false,
            dark_participation: 0.3,
            max_venues_per_order: 4,
            min_venue_size: 1,
            min_reliability: 0.8,
            cache_timeout_ms: 5_000,
            slippage_target_bps: 10.0,
            max_market_impact_bps: 50.0,
            impact_coefficient_bps: 10_000.0,
        }
    }
}

/// Errors from the planner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The parent order has nothing to allocate.
    #[error("parent order has zero quantity")]
    EmptyParent,

    /// No venue survived the pre-filter.
    #[error("no eligible venues for {symbol}")]
    NoEligibleVenues {
        /// The symbol that could not be routed.
        symbol: String,
    },
}

/// A venue that survived the pre-filter, with its executable price and size.
#[derive(Debug, Clone)]
struct Eligible<'a> {
    venue: &'a VenueDescriptor,
    price: u64,
    available: u64,
}

/// The smart order router.
#[derive(Debug, Clone, Default)]
pub struct SmartOrderRouter {
    config: RouterConfig,
}

impl SmartOrderRouter {
    /// Create a router with the given settings.
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// The active settings.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Plan venue allocations for a parent order.
    ///
    /// The returned plan carries expected cost, expected impact and a risk
    /// score; a plan whose impact exceeds the configured cap comes back with
    /// `approved == false` and must be rejected upstream.
    ///
    /// # Errors
    /// [`RouterError::EmptyParent`] for zero quantity,
    /// [`RouterError::NoEligibleVenues`] when the pre-filter leaves nothing.
    pub fn plan(
        &self,
        parent: &OrderIntent,
        venues: &[VenueDescriptor],
        now_ms: u64,
    ) -> Result<RoutePlan, RouterError> {
        if parent.quantity == 0 {
            return Err(RouterError::EmptyParent);
        }

        let mut lit = self.eligible_lit(parent, venues, now_ms);
        self.sort_by_preference(parent.side, &mut lit);

        let mut allocations: Vec<ChildAllocation> = Vec::new();
        let mut remaining = parent.quantity;

        // Dark phase of liquidity seeking runs before the lit allocation.
        if self.config.algorithm == RoutingAlgorithm::LiquiditySeeking
            && self.config.enable_dark_pools
        {
            let budget =
                (parent.quantity as f64 * self.config.dark_participation).floor() as u64;
            let taken = self.allocate_dark(parent, venues, budget, now_ms, &mut allocations);
            remaining -= taken;
        }

        if lit.is_empty() && allocations.is_empty() {
            return Err(RouterError::NoEligibleVenues {
                symbol: parent.symbol.clone(),
            });
        }

        let lit_slots = self
            .config
            .max_venues_per_order
            .saturating_sub(allocations.len());
        if remaining > 0 && lit_slots > 0 && !lit.is_empty() {
            match self.config.algorithm {
                RoutingAlgorithm::Twap | RoutingAlgorithm::LiquiditySeeking => {
                    self.allocate_greedy(parent, &lit, remaining, lit_slots, &mut allocations);
                }
                RoutingAlgorithm::Vwap => {
                    self.allocate_proportional(parent, &lit, remaining, lit_slots, &mut allocations);
                }
                RoutingAlgorithm::ImplementationShortfall => {
                    self.allocate_shortfall(parent, &mut lit, remaining, lit_slots, &mut allocations);
                }
            }
        }

        Ok(self.finish(parent, &lit, allocations))
    }

    fn eligible_lit<'a>(
        &self,
        parent: &OrderIntent,
        venues: &'a [VenueDescriptor],
        now_ms: u64,
    ) -> Vec<Eligible<'a>> {
        venues
            .iter()
            .filter(|venue| {
                venue.connected
                    && !venue.is_dark()
                    && venue.reliability >= self.config.min_reliability
                    && venue.quote_fresh(now_ms, self.config.cache_timeout_ms)
                    && venue.min_order_size <= parent.quantity
            })
            .filter_map(|venue| {
                let (price, available) = venue.executable(parent.side)?;
                if available == 0 {
                    return None;
                }
                // A parent limit bounds what any child may pay or accept.
                if let Some(limit) = parent.limit_price
                    && !parent.side.crosses(Some(limit), price)
                {
                    return None;
                }
                Some(Eligible {
                    venue,
                    price,
                    available,
                })
            })
            .collect()
    }

    fn sort_by_preference(&self, side: Side, eligible: &mut [Eligible<'_>]) {
        eligible.sort_by(|a, b| {
            let by_price = match side {
                Side::Buy => a.price.cmp(&b.price),
                Side::Sell => b.price.cmp(&a.price),
            };
            by_price
                .then_with(|| {
                    b.venue
                        .reliability
                        .partial_cmp(&a.venue.reliability)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.venue.avg_latency_us.cmp(&b.venue.avg_latency_us))
                .then_with(|| {
                    b.venue
                        .fill_rate
                        .partial_cmp(&a.venue.fill_rate)
                        .unwrap_or(Ordering::Equal)
                })
        });
    }

    /// Greedy best-price allocation (TWAP, and the lit phase of
    /// liquidity seeking).
    fn allocate_greedy(
        &self,
        parent: &OrderIntent,
        lit: &[Eligible<'_>],
        mut remaining: u64,
        slots: usize,
        allocations: &mut Vec<ChildAllocation>,
    ) {
        let mut taken: Vec<(usize, u64)> = Vec::new();
        for (index, candidate) in lit.iter().take(slots).enumerate() {
            if remaining == 0 {
                break;
            }
            let quantity = remaining
                .min(candidate.available)
                .min(candidate.venue.max_order_size);
            if quantity == 0 {
                continue;
            }
            taken.push((index, quantity));
            remaining -= quantity;
        }
        // Allocations below the venue-size floor are dropped, except the
        // final remainder.
        let last = taken.len().saturating_sub(1);
        for (position, (index, quantity)) in taken.iter().enumerate() {
            if *quantity < self.config.min_venue_size && position != last {
                trace!(
                    "dropping {} lot allocation to {} below floor",
                    quantity, lit[*index].venue.venue_id
                );
                continue;
            }
            allocations.push(self.child(parent, &lit[*index], *quantity, allocations.len()));
        }
    }

    /// Volume-weighted proportional allocation (VWAP).
    fn allocate_proportional(
        &self,
        parent: &OrderIntent,
        lit: &[Eligible<'_>],
        remaining: u64,
        slots: usize,
        allocations: &mut Vec<ChildAllocation>,
    ) {
        let pool: Vec<&Eligible<'_>> = lit.iter().take(slots).collect();
        let capacity: Vec<u64> = pool
            .iter()
            .map(|e| e.available.min(e.venue.max_order_size))
            .collect();
        let total_available: u64 = capacity.iter().sum();
        if total_available == 0 {
            return;
        }

        let mut shares: Vec<u64> = pool
            .iter()
            .zip(&capacity)
            .map(|(_, &cap)| {
                let weighted =
                    (remaining as u128 * cap as u128 / total_available as u128) as u64;
                weighted.min(cap)
            })
            .collect();

        // Rounding leftovers go to the venues with spare capacity, in
        // preference order.
        let mut leftover = remaining.saturating_sub(shares.iter().sum());
        for (share, &cap) in shares.iter_mut().zip(&capacity) {
            if leftover == 0 {
                break;
            }
            let extra = leftover.min(cap.saturating_sub(*share));
            *share += extra;
            leftover -= extra;
        }

        for (position, (&share, &eligible)) in shares.iter().zip(&pool).enumerate() {
            if share == 0 {
                continue;
            }
            if share < self.config.min_venue_size && position != pool.len() - 1 {
                continue;
            }
            allocations.push(self.child(parent, eligible, share, allocations.len()));
        }
    }

    /// Implementation shortfall: rank venues by price plus quadratic impact
    /// cost, take at most half a venue's visible size, skip venues whose
    /// impact alone breaks the cap.
    fn allocate_shortfall(
        &self,
        parent: &OrderIntent,
        lit: &mut Vec<Eligible<'_>>,
        mut remaining: u64,
        slots: usize,
        allocations: &mut Vec<ChildAllocation>,
    ) {
        let k = self.config.impact_coefficient_bps;
        let mut scored: Vec<(f64, Eligible<'_>)> = lit
            .drain(..)
            .filter_map(|candidate| {
                let cap = (candidate.available / 2).min(candidate.venue.max_order_size);
                if cap == 0 {
                    return None;
                }
                let take = remaining.min(cap);
                let ratio = take as f64 / candidate.available.max(1) as f64;
                let impact_bps = ratio * ratio * k;
                if impact_bps > self.config.max_market_impact_bps {
                    debug!(
                        "is: skipping {} with {:.1} bps impact",
                        candidate.venue.venue_id, impact_bps
                    );
                    return None;
                }
                let adjustment = candidate.price as f64 * impact_bps / 10_000.0;
                let effective = match parent.side {
                    Side::Buy => candidate.price as f64 + adjustment,
                    Side::Sell => candidate.price as f64 - adjustment,
                };
                Some((effective, candidate))
            })
            .collect();

        scored.sort_by(|a, b| {
            let by_cost = match parent.side {
                Side::Buy => a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal),
                Side::Sell => b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal),
            };
            by_cost.then_with(|| {
                b.1.venue
                    .reliability
                    .partial_cmp(&a.1.venue.reliability)
                    .unwrap_or(Ordering::Equal)
            })
        });

        for (_, candidate) in scored.iter().take(slots) {
            if remaining == 0 {
                break;
            }
            let cap = (candidate.available / 2).min(candidate.venue.max_order_size);
            let quantity = remaining.min(cap);
            if quantity == 0 || quantity < self.config.min_venue_size && remaining > quantity {
                continue;
            }
            allocations.push(self.child(parent, candidate, quantity, allocations.len()));
            remaining -= quantity;
        }

        lit.extend(scored.into_iter().map(|(_, e)| e));
    }

    /// Dark phase of liquidity seeking. Returns the quantity placed dark.
    fn allocate_dark(
        &self,
        parent: &OrderIntent,
        venues: &[VenueDescriptor],
        budget: u64,
        now_ms: u64,
        allocations: &mut Vec<ChildAllocation>,
    ) -> u64 {
        let mut dark: Vec<&VenueDescriptor> = venues
            .iter()
            .filter(|venue| {
                venue.connected
                    && venue.is_dark()
                    && venue.reliability >= self.config.min_reliability
                    && venue.hidden_liquidity >= self.config.min_venue_size
            })
            .collect();
        dark.sort_by(|a, b| {
            b.hidden_liquidity
                .cmp(&a.hidden_liquidity)
                .then_with(|| b.reliability.partial_cmp(&a.reliability).unwrap_or(Ordering::Equal))
        });

        let reference_price = parent
            .limit_price
            .or_else(|| dark.iter().find_map(|venue| venue.mid_price()))
            .or_else(|| {
                venues
                    .iter()
                    .filter(|venue| {
                        !venue.is_dark() && venue.quote_fresh(now_ms, self.config.cache_timeout_ms)
                    })
                    .find_map(|venue| venue.mid_price())
            });
        let Some(reference_price) = reference_price else {
            return 0;
        };

        let mut remaining = budget;
        for venue in dark.iter().take(self.config.max_venues_per_order) {
            if remaining == 0 {
                break;
            }
            let quantity = remaining
                .min(venue.hidden_liquidity)
                .min(venue.max_order_size);
            if quantity == 0 {
                continue;
            }
            allocations.push(ChildAllocation {
                venue_id: venue.venue_id.clone(),
                quantity,
                expected_price: venue.mid_price().unwrap_or(reference_price),
                priority: allocations.len() as u32,
                kind: OrderKind::Limit,
                tif: TimeInForce::Ioc,
            });
            remaining -= quantity;
        }
        budget - remaining
    }

    fn child(
        &self,
        parent: &OrderIntent,
        eligible: &Eligible<'_>,
        quantity: u64,
        priority: usize,
    ) -> ChildAllocation {
        let (kind, tif) = match parent.kind {
            OrderKind::Market => (OrderKind::Market, TimeInForce::Ioc),
            _ => (OrderKind::Limit, parent.tif),
        };
        ChildAllocation {
            venue_id: eligible.venue.venue_id.clone(),
            quantity,
            expected_price: eligible.price,
            priority: priority as u32,
            kind,
            tif,
        }
    }

    fn finish(
        &self,
        parent: &OrderIntent,
        lit: &[Eligible<'_>],
        allocations: Vec<ChildAllocation>,
    ) -> RoutePlan {
        let allocated: u64 = allocations.iter().map(|a| a.quantity).sum();
        let expected_cost: u128 = allocations
            .iter()
            .map(|a| a.quantity as u128 * a.expected_price as u128)
            .sum();

        let displayed: u64 = lit.iter().map(|e| e.available).sum();
        let expected_impact_bps = if displayed == 0 || allocated == 0 {
            0.0
        } else {
            let ratio = allocated as f64 / displayed as f64;
            ratio * ratio * self.config.impact_coefficient_bps
        };

        let best_price = allocations.first().map(|a| a.expected_price);
        let expected_slippage_bps = match (best_price, allocated) {
            (Some(best), allocated) if allocated > 0 && best > 0 => {
                let average = expected_cost as f64 / allocated as f64;
                (average - best as f64).abs() / best as f64 * 10_000.0
            }
            _ => 0.0,
        };
        if expected_slippage_bps > self.config.slippage_target_bps {
            debug!(
                "plan for {} expects {:.1} bps slippage against a {:.1} bps target",
                parent.symbol, expected_slippage_bps, self.config.slippage_target_bps
            );
        }

        let largest = allocations.iter().map(|a| a.quantity).max().unwrap_or(0);
        let fan_out = allocations.len() as f64 / self.config.max_venues_per_order.max(1) as f64;
        let size_share = if displayed == 0 {
            0.0
        } else {
            (allocated as f64 / displayed as f64).min(1.0)
        };
        let concentration = if allocated == 0 {
            0.0
        } else {
            largest as f64 / allocated as f64
        };
        let risk_score = ((fan_out + size_share + concentration) / 3.0).clamp(0.0, 1.0);

        let approved = expected_impact_bps <= self.config.max_market_impact_bps;
        if !approved {
            debug!(
                "plan for {} not approved: {:.1} bps expected impact",
                parent.symbol, expected_impact_bps
            );
        }

        RoutePlan {
            algorithm: self.config.algorithm,
            allocations,
            expected_cost,
            expected_impact_bps,
            expected_slippage_bps,
            risk_score,
            approved,
            unallocated: parent.quantity - allocated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeInForce;
    use crate::router::fees::FeeSchedule;
    use crate::router::venue::{VenueKind, VenueQuote};

    fn lit_venue(id: &str, ask: u64, ask_size: u64) -> VenueDescriptor {
        VenueDescriptor {
            venue_id: id.to_string(),
            kind: VenueKind::LitExchange,
            connected: true,
            quote: Some(VenueQuote {
                bid_price: ask - 2,
                bid_size: ask_size,
                ask_price: ask,
                ask_size,
                updated_ms: 1_000,
            }),
            reliability: 0.95,
            fill_rate: 0.9,
            avg_latency_us: 250,
            min_order_size: 1,
            max_order_size: 1_000_000,
            tick_size: 1,
            fees: FeeSchedule::new(-1, 3),
            hidden_liquidity: 0,
        }
    }

    fn dark_venue(id: &str, hidden: u64) -> VenueDescriptor {
        let mut venue = lit_venue(id, 100, 0);
        venue.kind = VenueKind::DarkPool;
        venue.quote = None;
        venue.hidden_liquidity = hidden;
        venue
    }

    fn parent_buy(quantity: u64, limit: u64) -> OrderIntent {
        OrderIntent::limit("BTC/USD", Side::Buy, limit, quantity, TimeInForce::Gtc)
    }

    fn router(config: RouterConfig) -> SmartOrderRouter {
        SmartOrderRouter::new(config)
    }

    #[test]
    fn test_prefilter_drops_unusable_venues() {
        let mut stale = lit_venue("stale", 100, 50);
        stale.quote = Some(VenueQuote {
            updated_ms: 0,
            ..stale.quote.unwrap()
        });
        let mut disconnected = lit_venue("down", 100, 50);
        disconnected.connected = false;
        let mut unreliable = lit_venue("flaky", 100, 50);
        unreliable.reliability = 0.5;
        let good = lit_venue("good", 100, 50);

        let sor = router(RouterConfig::default());
        let plan = sor
            .plan(
                &parent_buy(10, 105),
                &[stale, disconnected, unreliable, good],
                6_000,
            )
            .unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].venue_id, "good");
    }

    #[test]
    fn test_no_eligible_venues() {
        let mut down = lit_venue("down", 100, 50);
        down.connected = false;
        let sor = router(RouterConfig::default());
        assert_eq!(
            sor.plan(&parent_buy(10, 105), &[down], 2_000),
            Err(RouterError::NoEligibleVenues {
                symbol: "BTC/USD".to_string()
            })
        );
    }

    #[test]
    fn test_twap_takes_best_price_first() {
        let sor = router(RouterConfig::default());
        let venues = [
            lit_venue("expensive", 102, 100),
            lit_venue("cheap", 100, 30),
            lit_venue("middle", 101, 100),
        ];
        let plan = sor.plan(&parent_buy(50, 105), &venues, 2_000).unwrap();

        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].venue_id, "cheap");
        assert_eq!(plan.allocations[0].quantity, 30);
        assert_eq!(plan.allocations[1].venue_id, "middle");
        assert_eq!(plan.allocations[1].quantity, 20);
        assert_eq!(plan.unallocated, 0);
        assert_eq!(plan.expected_cost, 30 * 100 + 20 * 101);
        // Average 100.4 against a best of 100.
        assert!((plan.expected_slippage_bps - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_twap_respects_parent_limit() {
        let sor = router(RouterConfig::default());
        let venues = [lit_venue("cheap", 100, 30), lit_venue("above", 106, 100)];
        let plan = sor.plan(&parent_buy(50, 105), &venues, 2_000).unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocated_quantity(), 30);
        assert_eq!(plan.unallocated, 20);
    }

    #[test]
    fn test_twap_venue_cap() {
        let config = RouterConfig {
            max_venues_per_order: 2,
            ..Default::default()
        };
        let sor = router(config);
        let venues = [
            lit_venue("a", 100, 10),
            lit_venue("b", 101, 10),
            lit_venue("c", 102, 10),
        ];
        let plan = sor.plan(&parent_buy(30, 105), &venues, 2_000).unwrap();
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.unallocated, 10);
    }

    #[test]
    fn test_twap_drops_sub_floor_allocations_except_last() {
        let config = RouterConfig {
            min_venue_size: 10,
            ..Default::default()
        };
        let sor = router(config);
        // Second venue would receive only 5, the final remainder: kept.
        let venues = [lit_venue("a", 100, 45), lit_venue("b", 101, 100)];
        let plan = sor.plan(&parent_buy(50, 105), &venues, 2_000).unwrap();
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[1].quantity, 5);
    }

    #[test]
    fn test_tie_breaks_price_then_reliability_then_latency() {
        let mut reliable = lit_venue("reliable", 100, 50);
        reliable.reliability = 0.99;
        let mut fast = lit_venue("fast", 100, 50);
        fast.reliability = 0.99;
        fast.avg_latency_us = 50;
        let slow = lit_venue("slow", 100, 50);

        let sor = router(RouterConfig::default());
        let plan = sor
            .plan(&parent_buy(120, 105), &[slow, reliable, fast], 2_000)
            .unwrap();
        let order: Vec<&str> = plan
            .allocations
            .iter()
            .map(|a| a.venue_id.as_str())
            .collect();
        assert_eq!(order, vec!["fast", "reliable", "slow"]);
    }

    #[test]
    fn test_vwap_allocates_proportionally() {
        let config = RouterConfig {
            algorithm: RoutingAlgorithm::Vwap,
            ..Default::default()
        };
        let sor = router(config);
        // 300 available split 2:1.
        let venues = [lit_venue("big", 100, 200), lit_venue("small", 100, 100)];
        let plan = sor.plan(&parent_buy(90, 105), &venues, 2_000).unwrap();
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].quantity, 60);
        assert_eq!(plan.allocations[1].quantity, 30);
        assert_eq!(plan.unallocated, 0);
    }

    #[test]
    fn test_is_skips_high_impact_and_caps_at_half_visible() {
        let config = RouterConfig {
            algorithm: RoutingAlgorithm::ImplementationShortfall,
            max_market_impact_bps: 500.0,
            ..Default::default()
        };
        let sor = router(config);
        // Thin venue: taking even half of 10 lots is (5/10)^2*10_000 = 2_500 bps.
        let venues = [lit_venue("thin", 99, 10), lit_venue("deep", 100, 1_000)];
        let plan = sor.plan(&parent_buy(100, 105), &venues, 2_000).unwrap();

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].venue_id, "deep");
        // Half of the visible 1_000.
        assert_eq!(plan.allocations[0].quantity, 100);
    }

    #[test]
    fn test_liquidity_seeking_dark_first_with_ioc() {
        let config = RouterConfig {
            algorithm: RoutingAlgorithm::LiquiditySeeking,
            enable_dark_pools: true,
            dark_participation: 0.5,
            min_venue_size: 10,
            ..Default::default()
        };
        let sor = router(config);
        let venues = [
            lit_venue("lit", 100, 200),
            dark_venue("pool", 500),
            dark_venue("shallow", 5),
        ];
        let plan = sor.plan(&parent_buy(100, 105), &venues, 2_000).unwrap();

        // Dark budget 50 goes to the deep pool; the shallow one is below
        // the floor. Remainder goes through TWAP on lit venues only.
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].venue_id, "pool");
        assert_eq!(plan.allocations[0].quantity, 50);
        assert_eq!(plan.allocations[0].tif, TimeInForce::Ioc);
        assert_eq!(plan.allocations[1].venue_id, "lit");
        assert_eq!(plan.allocations[1].quantity, 50);
        assert_eq!(plan.unallocated, 0);
    }

    #[test]
    fn test_liquidity_seeking_without_dark_is_twap() {
        let config = RouterConfig {
            algorithm: RoutingAlgorithm::LiquiditySeeking,
            enable_dark_pools: false,
            ..Default::default()
        };
        let sor = router(config);
        let venues = [lit_venue("lit", 100, 200), dark_venue("pool", 500)];
        let plan = sor.plan(&parent_buy(100, 105), &venues, 2_000).unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].venue_id, "lit");
    }

    #[test]
    fn test_plan_not_approved_over_impact_cap() {
        let config = RouterConfig {
            max_market_impact_bps: 10.0,
            ..Default::default()
        };
        let sor = router(config);
        // Taking the entire displayed size: impact = 10_000 bps.
        let venues = [lit_venue("only", 100, 50)];
        let plan = sor.plan(&parent_buy(50, 105), &venues, 2_000).unwrap();
        assert!(!plan.approved);
        assert!(plan.expected_impact_bps > 10.0);
    }

    #[test]
    fn test_market_parent_produces_market_ioc_children() {
        let sor = router(RouterConfig::default());
        let parent = OrderIntent::market("BTC/USD", Side::Buy, 10);
        let plan = sor.plan(&parent, &[lit_venue("v", 100, 50)], 2_000).unwrap();
        assert_eq!(plan.allocations[0].kind, OrderKind::Market);
        assert_eq!(plan.allocations[0].tif, TimeInForce::Ioc);
    }

    #[test]
    fn test_empty_parent_rejected() {
        let sor = router(RouterConfig::default());
        assert_eq!(
            sor.plan(&parent_buy(0, 105), &[lit_venue("v", 100, 50)], 2_000),
            Err(RouterError::EmptyParent)
        );
    }

    #[test]
    fn test_sell_side_prefers_highest_bid() {
        let sor = router(RouterConfig::default());
        let mut low = lit_venue("low", 100, 50);
        low.quote.as_mut().unwrap().bid_price = 97;
        let mut high = lit_venue("high", 100, 50);
        high.quote.as_mut().unwrap().bid_price = 99;

        let parent = OrderIntent::limit("BTC/USD", Side::Sell, 95, 40, TimeInForce::Gtc);
        let plan = sor.plan(&parent, &[low, high], 2_000).unwrap();
        assert_eq!(plan.allocations[0].venue_id, "high");
        assert_eq!(plan.allocations[0].expected_price, 99);
    }
}
