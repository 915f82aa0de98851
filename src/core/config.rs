//! Engine configuration.
//!
//! Construction and atomic swapping only; loading from files or the
//! environment belongs to the embedding application.

use crate::orderbook::SelfTradePolicy;
use crate::risk::RiskLimits;
use crate::router::RouterConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the matching engine and its collaborators.
///
/// `tick_size` and `lot_size` set the increment discipline for every book
/// the engine creates. The initial risk limits table can be swapped at
/// runtime through the gate's `update_limits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum price increment in ticks. Prices must be exact multiples.
    pub tick_size: u64,
    /// Minimum quantity increment in lots. Quantities must be exact multiples.
    pub lot_size: u64,
    /// What happens when an aggressor would cross its own resting order.
    pub self_trade_policy: SelfTradePolicy,
    /// Master switch for per-symbol circuit breakers.
    pub enable_circuit_breakers: bool,
    /// Price move (basis points against the previous observation) that trips
    /// the breaker.
    pub price_change_threshold_bps: u64,
    /// Traded volume within the observation window that trips the breaker.
    pub volume_threshold: u64,
    /// Realized volatility (basis points) that trips the breaker.
    pub volatility_threshold_bps: u64,
    /// Silence window after a trip, in milliseconds.
    pub circuit_cooldown_ms: u64,
    /// Trip emergency stop automatically on configured breaches.
    pub auto_stop_on_violation: bool,
    /// Initial risk limits table.
    pub limits: RiskLimits,
    /// Smart order router settings.
    pub router: RouterConfig,
    /// Number of matching workers. Zero means one per available core.
    pub worker_count: usize,
    /// Capacity of each ingress ring. Must be a power of two.
    pub ring_capacity: usize,
    /// Cadence of the resting-order expiry scan, in milliseconds.
    pub expiry_scan_interval_ms: u64,
    /// Depth used for published best-of-book snapshots.
    pub snapshot_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_size: 1,
            lot_size: 1,
            self_trade_policy: SelfTradePolicy::default(),
            enable_circuit_breakers: true,
            price_change_threshold_bps: 500,
            volume_threshold: 1_000_000,
            volatility_threshold_bps: 300,
            circuit_cooldown_ms: 5 * 60 * 1_000,
            auto_stop_on_violation: true,
            limits: RiskLimits::default(),
            router: RouterConfig::default(),
            worker_count: 0,
            ring_capacity: 4_096,
            expiry_scan_interval_ms: 100,
            snapshot_depth: 10,
        }
    }
}

impl EngineConfig {
    /// Effective worker count, resolving zero to the available parallelism.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.worker_count > 0 {
            self.worker_count
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}
