//! Per-symbol circuit breakers.
//!
//! A breaker trips when the observed trade price jumps more than the
//! configured basis-point threshold against the previous print, or when
//! traded volume inside the observation window spikes past its threshold.
//! A tripped breaker silences the symbol for the cooldown, then re-arms.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Volume observation window.
const VOLUME_WINDOW_MS: u64 = 60_000;

/// Thresholds and cooldown for the breaker bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Master switch.
    pub enabled: bool,
    /// Price move against the previous print that trips, in basis points.
    pub price_change_threshold_bps: u64,
    /// Volume inside the observation window that trips.
    pub volume_threshold: u64,
    /// Smoothed realized volatility that trips, in basis points.
    pub volatility_threshold_bps: u64,
    /// Post-trip silence, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            price_change_threshold_bps: 500,
            volume_threshold: 1_000_000,
            volatility_threshold_bps: 300,
            cooldown_ms: 5 * 60 * 1_000,
        }
    }
}

#[derive(Debug, Default)]
struct Breaker {
    last_price: AtomicU64,
    window_volume: AtomicU64,
    window_start_ms: AtomicU64,
    tripped_until_ms: AtomicU64,
    /// EWMA of absolute per-print moves, in basis points (1/8 weight).
    ewma_move_bps: AtomicU64,
}

/// All symbols' circuit breakers.
pub struct CircuitBreakerBank {
    config: BreakerConfig,
    breakers: DashMap<String, Breaker>,
}

impl CircuitBreakerBank {
    /// Create a bank with the given thresholds.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Milliseconds of cooldown remaining for `symbol`, if tripped.
    #[must_use]
    pub fn tripped_remaining_ms(&self, symbol: &str, now_ms: u64) -> Option<u64> {
        if !self.config.enabled {
            return None;
        }
        let breaker = self.breakers.get(symbol)?;
        let until = breaker.tripped_until_ms.load(Ordering::Acquire);
        (until > now_ms).then(|| until - now_ms)
    }

    /// Feed a trade print. Returns `true` when this observation tripped the
    /// breaker.
    pub fn observe_trade(&self, symbol: &str, price: u64, quantity: u64, now_ms: u64) -> bool {
        if !self.config.enabled {
            return false;
        }
        let breaker = self.breakers.entry(symbol.to_string()).or_default();

        // Roll the volume window.
        let window_start = breaker.window_start_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(window_start) > VOLUME_WINDOW_MS {
            breaker.window_start_ms.store(now_ms, Ordering::Release);
            breaker.window_volume.store(0, Ordering::Release);
        }
        let volume = breaker
            .window_volume
            .fetch_add(quantity, Ordering::AcqRel)
            .saturating_add(quantity);

        let previous = breaker.last_price.swap(price, Ordering::AcqRel);
        let mut tripped = false;

        if previous > 0 {
            let move_bps =
                (price.abs_diff(previous) as u128).saturating_mul(10_000) / previous as u128;
            if move_bps > self.config.price_change_threshold_bps as u128 {
                warn!(
                    "circuit breaker: {} moved {} bps ({} -> {})",
                    symbol, move_bps, previous, price
                );
                tripped = true;
            }
            let ewma = breaker.ewma_move_bps.load(Ordering::Acquire);
            let ewma = (ewma.saturating_mul(7) + move_bps as u64) / 8;
            breaker.ewma_move_bps.store(ewma, Ordering::Release);
            if ewma > self.config.volatility_threshold_bps {
                warn!(
                    "circuit breaker: {} realized volatility {} bps over threshold",
                    symbol, ewma
                );
                tripped = true;
            }
        }
        if volume > self.config.volume_threshold {
            warn!(
                "circuit breaker: {} volume {} spiked past {}",
                symbol, volume, self.config.volume_threshold
            );
            tripped = true;
        }

        if tripped {
            breaker
                .tripped_until_ms
                .store(now_ms + self.config.cooldown_ms, Ordering::Release);
        }
        tripped
    }

    /// Manually trip a symbol's breaker.
    pub fn trip(&self, symbol: &str, now_ms: u64) {
        let breaker = self.breakers.entry(symbol.to_string()).or_default();
        breaker
            .tripped_until_ms
            .store(now_ms + self.config.cooldown_ms, Ordering::Release);
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}
