//! Net positions, mark prices and exposure tracking.

use crate::core::Side;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// An `f64` stored as bits in an `AtomicU64`, updated lock-free.
#[derive(Debug)]
struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    fn fetch_add(&self, delta: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return f64::from_bits(next),
                Err(observed) => current = observed,
            }
        }
    }
}

/// Per-symbol net positions with mark prices and a running gross exposure.
///
/// Positions are signed lots; exposure is `sum(|position| x mark)` over all
/// symbols, maintained incrementally so the gate reads it in O(1).
pub struct PositionBook {
    positions: DashMap<String, AtomicI64>,
    marks: DashMap<String, AtomicU64>,
    gross_exposure: AtomicF64,
    daily_realized_pnl: AtomicF64,
}

impl PositionBook {
    /// Create an empty position book.
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
            marks: DashMap::new(),
            gross_exposure: AtomicF64::new(0.0),
            daily_realized_pnl: AtomicF64::new(0.0),
        }
    }

    /// Current signed net position for `symbol`, in lots.
    #[must_use]
    pub fn net_position(&self, symbol: &str) -> i64 {
        self.positions
            .get(symbol)
            .map(|p| p.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Current mark price for `symbol`, in ticks.
    #[must_use]
    pub fn mark_price(&self, symbol: &str) -> Option<u64> {
        self.marks
            .get(symbol)
            .map(|m| m.load(Ordering::Acquire))
            .filter(|&m| m > 0)
    }

    /// Update a symbol's mark price, adjusting the exposure aggregate.
    pub fn set_mark_price(&self, symbol: &str, price: u64) {
        let entry = self.marks.entry(symbol.to_string()).or_default();
        let old = entry.swap(price, Ordering::AcqRel);
        let position = self.net_position(symbol).unsigned_abs() as f64;
        if position > 0.0 {
            self.gross_exposure
                .fetch_add(position * (price as f64 - old as f64));
        }
    }

    /// Apply a fill, adjusting the position and the exposure aggregate.
    pub fn apply_fill(&self, symbol: &str, side: Side, quantity: u64, price: u64) {
        let entry = self.positions.entry(symbol.to_string()).or_default();
        let delta = match side {
            Side::Buy => quantity as i64,
            Side::Sell => -(quantity as i64),
        };
        let old = entry.fetch_add(delta, Ordering::AcqRel);
        let new = old + delta;
        let mark = self.mark_price(symbol).unwrap_or(price) as f64;
        self.gross_exposure
            .fetch_add((new.unsigned_abs() as f64 - old.unsigned_abs() as f64) * mark);
    }

    /// Current gross exposure, `sum(|position| x mark)`.
    #[must_use]
    pub fn gross_exposure(&self) -> f64 {
        self.gross_exposure.load().max(0.0)
    }

    /// Value of the largest single position, scanning active symbols.
    #[must_use]
    pub fn largest_position_value(&self) -> f64 {
        let mut largest: f64 = 0.0;
        for entry in self.positions.iter() {
            let position = entry.value().load(Ordering::Acquire).unsigned_abs() as f64;
            if position == 0.0 {
                continue;
            }
            let mark = self.mark_price(entry.key()).unwrap_or(0) as f64;
            largest = largest.max(position * mark);
        }
        largest
    }

    /// Record realized P&L from post-trade. Returns the running daily total.
    pub fn record_realized_pnl(&self, delta: f64) -> f64 {
        self.daily_realized_pnl.fetch_add(delta)
    }

    /// Running daily realized P&L.
    #[must_use]
    pub fn daily_realized_pnl(&self) -> f64 {
        self.daily_realized_pnl.load()
    }

    /// Reset the daily P&L accumulator, e.g. at session roll.
    pub fn reset_daily_pnl(&self) {
        self.daily_realized_pnl.store(0.0);
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
