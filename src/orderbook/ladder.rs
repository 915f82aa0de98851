//! Price-level ladder: an ordered map from tick price to level, with a
//! cached best price.
//!
//! The ladder is keyed by integer ticks and walks in priority order for its
//! side: descending for bids, ascending for asks. The skip list keeps prices
//! sorted so matching never sorts; the best-price cache makes `best()` O(1)
//! amortized and is invalidated when the best level is removed.
//!
//! Tick discipline is enforced here, not by the matching engine: an
//! insertion whose price is off the tick grid is rejected.

use super::error::OrderBookError;
use super::level::{LevelSnapshot, PriceLevel};
use crate::core::Side;
use crossbeam::utils::CachePadded;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel for "no cached best"; real prices are always positive.
const BEST_UNKNOWN: u64 = 0;

/// One side of an order book.
pub struct Ladder {
    side: Side,
    tick_size: u64,
    levels: SkipMap<u64, Arc<PriceLevel>>,
    best: CachePadded<AtomicU64>,
}

impl Ladder {
    /// Create an empty ladder for `side` with the given tick size.
    pub fn new(side: Side, tick_size: u64) -> Self {
        Self {
            side,
            tick_size,
            levels: SkipMap::new(),
            best: CachePadded::new(AtomicU64::new(BEST_UNKNOWN)),
        }
    }

    /// The side this ladder serves.
    #[must_use]
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// The configured tick size.
    #[must_use]
    #[inline]
    pub fn tick_size(&self) -> u64 {
        self.tick_size
    }

    /// Number of non-empty price levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the ladder has no levels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Validate a price against the tick grid.
    ///
    /// # Errors
    /// Returns [`OrderBookError::InvalidTick`] for zero prices and prices
    /// that are not multiples of the tick size.
    pub fn validate_price(&self, price: u64) -> Result<(), OrderBookError> {
        if price == 0 || !price.is_multiple_of(self.tick_size) {
            return Err(OrderBookError::InvalidTick {
                price,
                tick_size: self.tick_size,
            });
        }
        Ok(())
    }

    /// Get the level at `price`, creating it if absent.
    ///
    /// # Errors
    /// Returns [`OrderBookError::InvalidTick`] when the price is off the
    /// tick grid.
    pub fn find_or_insert(&self, price: u64) -> Result<Arc<PriceLevel>, OrderBookError> {
        self.validate_price(price)?;
        let level = self
            .levels
            .get_or_insert(price, Arc::new(PriceLevel::new(price)))
            .value()
            .clone();

        let cached = self.best.load(Ordering::Acquire);
        if cached != BEST_UNKNOWN && self.is_better(price, cached) {
            self.best.store(price, Ordering::Release);
        }
        Ok(level)
    }

    /// Look up an existing level.
    #[must_use]
    pub fn get(&self, price: u64) -> Option<Arc<PriceLevel>> {
        self.levels.get(&price).map(|entry| entry.value().clone())
    }

    /// Best price on this ladder, O(1) amortized via the cache.
    #[must_use]
    pub fn best(&self) -> Option<u64> {
        let cached = self.best.load(Ordering::Acquire);
        if cached != BEST_UNKNOWN {
            return Some(cached);
        }
        let recomputed = match self.side {
            Side::Buy => self.levels.back().map(|entry| *entry.key()),
            Side::Sell => self.levels.front().map(|entry| *entry.key()),
        };
        if let Some(price) = recomputed {
            self.best.store(price, Ordering::Release);
        }
        recomputed
    }

    /// Best level on this ladder.
    #[must_use]
    pub fn best_level(&self) -> Option<Arc<PriceLevel>> {
        self.best().and_then(|price| self.get(price))
    }

    /// Walk levels in priority order (price-descending for bids,
    /// price-ascending for asks) until the visitor returns `false`.
    pub fn walk_from_best<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<PriceLevel>) -> bool,
    {
        match self.side {
            Side::Buy => {
                for entry in self.levels.iter().rev() {
                    if !visitor(entry.value()) {
                        break;
                    }
                }
            }
            Side::Sell => {
                for entry in self.levels.iter() {
                    if !visitor(entry.value()) {
                        break;
                    }
                }
            }
        }
    }

    /// Remove the level at `price`. The best cache is invalidated when the
    /// cached best goes away.
    pub fn remove(&self, price: u64) {
        self.levels.remove(&price);
        if self.best.load(Ordering::Acquire) == price {
            self.best.store(BEST_UNKNOWN, Ordering::Release);
        }
    }

    /// Remove the level at `price` only if it holds no orders.
    pub fn remove_if_empty(&self, price: u64) {
        if let Some(entry) = self.levels.get(&price)
            && entry.value().is_empty()
        {
            self.remove(price);
        }
    }

    /// Top-N levels in priority order for publishing.
    #[must_use]
    pub fn snapshot_top_n(&self, n: usize) -> Vec<LevelSnapshot> {
        let mut out = Vec::with_capacity(n.min(16));
        self.walk_from_best(|level| {
            if !level.is_empty() {
                out.push(level.snapshot());
            }
            out.len() < n
        });
        out
    }

    #[inline]
    fn is_better(&self, candidate: u64, current: u64) -> bool {
        match self.side {
            Side::Buy => candidate > current,
            Side::Sell => candidate < current,
        }
    }
}

impl std::fmt::Debug for Ladder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ladder")
            .field("side", &self.side)
            .field("tick_size", &self.tick_size)
            .field("levels", &self.levels.len())
            .field("best", &self.best())
            .finish()
    }
}
