//! Order book snapshot for market data

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

use super::book::OrderBook;
use super::error::OrderBookError;
use super::level::LevelSnapshot;
use crate::utils::monotonic_nanos;

/// A snapshot of the order book state at a specific sequence number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// The symbol or identifier for this order book
    pub symbol: String,

    /// The book sequence number this snapshot corresponds to
    pub seq: u64,

    /// Monotonic timestamp when the snapshot was created (nanoseconds)
    pub timestamp_ns: u64,

    /// Snapshot of bid price levels, best first
    pub bids: Vec<LevelSnapshot>,

    /// Snapshot of ask price levels, best first
    pub asks: Vec<LevelSnapshot>,

    /// Price of the last trade, if any trade occurred
    pub last_trade_price: Option<u64>,

    /// Total quantity traded over the book's lifetime
    pub cumulative_volume: u64,
}

impl BookSnapshot {
    /// Get the best bid price and quantity
    pub fn best_bid(&self) -> Option<(u64, u64)> {
        let best = self.bids.first().map(|level| (level.price, level.quantity));
        trace!("best_bid: {:?}", best);
        best
    }

    /// Get the best ask price and quantity
    pub fn best_ask(&self) -> Option<(u64, u64)> {
        let best = self.asks.first().map(|level| (level.price, level.quantity));
        trace!("best_ask: {:?}", best);
        best
    }

    /// Get the mid price (average of best bid and best ask)
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }

    /// Get the spread (best ask - best bid)
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    /// Calculate the total volume on the bid side
    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().map(|level| level.quantity).sum()
    }

    /// Calculate the total volume on the ask side
    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().map(|level| level.quantity).sum()
    }
}

/// Format version used for checksum-enabled order book snapshots.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Wrapper that provides checksum validation for [`BookSnapshot`] instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPackage {
    /// Version of the snapshot schema for forward compatibility.
    pub version: u32,
    /// Snapshot payload.
    pub snapshot: BookSnapshot,
    /// Hex-encoded checksum of the serialized snapshot.
    pub checksum: String,
}

impl SnapshotPackage {
    /// Creates a new snapshot package computing the checksum of the snapshot contents.
    pub fn new(snapshot: BookSnapshot) -> Result<Self, OrderBookError> {
        let checksum = Self::compute_checksum(&snapshot)?;
        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            snapshot,
            checksum,
        })
    }

    /// Serializes the package to JSON.
    pub fn to_json(&self) -> Result<String, OrderBookError> {
        serde_json::to_string(self).map_err(|error| OrderBookError::SerializationError {
            message: error.to_string(),
        })
    }

    /// Deserializes the package from JSON.
    pub fn from_json(data: &str) -> Result<Self, OrderBookError> {
        serde_json::from_str(data).map_err(|error| OrderBookError::DeserializationError {
            message: error.to_string(),
        })
    }

    /// Validates the checksum and version.
    pub fn validate(&self) -> Result<(), OrderBookError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(OrderBookError::DeserializationError {
                message: format!(
                    "unsupported snapshot version: {} (expected {})",
                    self.version, SNAPSHOT_FORMAT_VERSION
                ),
            });
        }
        let computed = Self::compute_checksum(&self.snapshot)?;
        if computed != self.checksum {
            return Err(OrderBookError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual: computed,
            });
        }
        Ok(())
    }

    /// Consumes the package and returns the validated snapshot.
    pub fn into_snapshot(self) -> Result<BookSnapshot, OrderBookError> {
        self.validate()?;
        Ok(self.snapshot)
    }

    fn compute_checksum(snapshot: &BookSnapshot) -> Result<String, OrderBookError> {
        let payload =
            serde_json::to_vec(snapshot).map_err(|error| OrderBookError::SerializationError {
                message: error.to_string(),
            })?;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        let checksum_bytes = hasher.finalize();
        Ok(checksum_bytes
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>())
    }
}

bitflags! {
    /// Selects which derived metrics an enriched snapshot computes.
    ///
    /// The level data itself is always included; flags only gate the
    /// derived numbers, so callers on a hot path pay for exactly what they
    /// read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MetricFlags: u8 {
        /// Mid price and spread in basis points, from the two best levels.
        const TOP_OF_BOOK = 1;

        /// Total resting lots per side.
        const DEPTH = 1 << 1;

        /// Quantity-weighted average price per side, in ticks.
        const VWAP = 1 << 2;

        /// Bid/ask pressure ratio in [-1, 1].
        const IMBALANCE = 1 << 3;

        /// Everything.
        const ALL = Self::TOP_OF_BOOK.bits()
            | Self::DEPTH.bits()
            | Self::VWAP.bits()
            | Self::IMBALANCE.bits();
    }
}

/// Running totals for one side, filled in a single sweep over its levels.
#[derive(Debug, Default, Clone, Copy)]
struct SideTotals {
    lots: u64,
    tick_lots: u128,
}

impl SideTotals {
    fn absorb(&mut self, level: &LevelSnapshot) {
        self.lots = self.lots.saturating_add(level.quantity);
        self.tick_lots = self
            .tick_lots
            .saturating_add((level.price as u128).saturating_mul(level.quantity as u128));
    }

    fn vwap(self) -> Option<f64> {
        (self.lots > 0).then(|| self.tick_lots as f64 / self.lots as f64)
    }
}

/// A snapshot with its derived metrics pre-computed.
///
/// One sweep per side fills the totals every metric is derived from, so
/// requesting several metrics costs no extra passes over the levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSnapshot {
    /// The symbol or identifier for this order book
    pub symbol: String,

    /// The book sequence number this snapshot corresponds to
    pub seq: u64,

    /// Monotonic timestamp when the snapshot was created (nanoseconds)
    pub timestamp_ns: u64,

    /// Snapshot of bid price levels, best first
    pub bids: Vec<LevelSnapshot>,

    /// Snapshot of ask price levels, best first
    pub asks: Vec<LevelSnapshot>,

    /// Midpoint of the best bid and ask, in ticks.
    pub mid_price: Option<f64>,

    /// Best-ask minus best-bid as a fraction of the mid, in basis points.
    pub spread_bps: Option<f64>,

    /// Resting lots across the included bid levels.
    pub bid_depth: u64,

    /// Resting lots across the included ask levels.
    pub ask_depth: u64,

    /// Quantity-weighted average bid price, in ticks.
    pub vwap_bid: Option<f64>,

    /// Quantity-weighted average ask price, in ticks.
    pub vwap_ask: Option<f64>,

    /// (bid lots - ask lots) / (bid lots + ask lots); positive means buy
    /// pressure.
    pub imbalance: f64,
}

impl EnrichedSnapshot {
    fn with_metrics(
        symbol: String,
        seq: u64,
        bids: Vec<LevelSnapshot>,
        asks: Vec<LevelSnapshot>,
        flags: MetricFlags,
    ) -> Self {
        let mut bid_totals = SideTotals::default();
        for level in &bids {
            bid_totals.absorb(level);
        }
        let mut ask_totals = SideTotals::default();
        for level in &asks {
            ask_totals.absorb(level);
        }

        let (mid_price, spread_bps) = if flags.contains(MetricFlags::TOP_OF_BOOK) {
            top_of_book(bids.first(), asks.first())
        } else {
            (None, None)
        };

        let (bid_depth, ask_depth) = if flags.contains(MetricFlags::DEPTH) {
            (bid_totals.lots, ask_totals.lots)
        } else {
            (0, 0)
        };

        let (vwap_bid, vwap_ask) = if flags.contains(MetricFlags::VWAP) {
            (bid_totals.vwap(), ask_totals.vwap())
        } else {
            (None, None)
        };

        let imbalance = if flags.contains(MetricFlags::IMBALANCE) {
            pressure_ratio(bid_totals.lots, ask_totals.lots)
        } else {
            0.0
        };

        Self {
            symbol,
            seq,
            timestamp_ns: monotonic_nanos(),
            bids,
            asks,
            mid_price,
            spread_bps,
            bid_depth,
            ask_depth,
            vwap_bid,
            vwap_ask,
            imbalance,
        }
    }
}

/// Mid price and spread from the two best levels. Needs both sides; a
/// one-sided book has neither metric.
fn top_of_book(
    best_bid: Option<&LevelSnapshot>,
    best_ask: Option<&LevelSnapshot>,
) -> (Option<f64>, Option<f64>) {
    let (Some(bid), Some(ask)) = (best_bid, best_ask) else {
        return (None, None);
    };
    let mid = (bid.price as f64 + ask.price as f64) / 2.0;
    if mid <= 0.0 {
        return (None, None);
    }
    let spread_bps = ask.price.saturating_sub(bid.price) as f64 / mid * 10_000.0;
    (Some(mid), Some(spread_bps))
}

/// Signed share of resting lots on the bid side, in [-1, 1].
fn pressure_ratio(bid_lots: u64, ask_lots: u64) -> f64 {
    let total = bid_lots.saturating_add(ask_lots);
    if total == 0 {
        0.0
    } else {
        (bid_lots as f64 - ask_lots as f64) / total as f64
    }
}

impl OrderBook {
    /// Take a top-`depth` snapshot associated with a sequence number.
    ///
    /// The read retries while the writer is advancing the book so the levels
    /// and the sequence number agree; after a few contended attempts it
    /// returns the latest read, stamped with the sequence observed after it.
    #[must_use]
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        const MAX_ATTEMPTS: usize = 8;

        let mut attempt = 0;
        loop {
            let seq_before = self.sequence();
            let bids = self.bids.snapshot_top_n(depth);
            let asks = self.asks.snapshot_top_n(depth);
            let seq_after = self.sequence();
            attempt += 1;
            if seq_before == seq_after || attempt >= MAX_ATTEMPTS {
                return BookSnapshot {
                    symbol: self.symbol().to_string(),
                    seq: seq_after,
                    timestamp_ns: monotonic_nanos(),
                    bids,
                    asks,
                    last_trade_price: self.last_trade().map(|(price, _)| price),
                    cumulative_volume: self.cumulative_volume(),
                };
            }
        }
    }

    /// Take an enriched snapshot with all metrics calculated.
    #[must_use]
    pub fn enriched_snapshot(&self, depth: usize) -> EnrichedSnapshot {
        self.enriched_snapshot_with_metrics(depth, MetricFlags::ALL)
    }

    /// Take an enriched snapshot with a custom metric selection.
    #[must_use]
    pub fn enriched_snapshot_with_metrics(
        &self,
        depth: usize,
        flags: MetricFlags,
    ) -> EnrichedSnapshot {
        let base = self.snapshot(depth);
        EnrichedSnapshot::with_metrics(base.symbol, base.seq, base.bids, base.asks, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: u64, quantity: u64) -> LevelSnapshot {
        LevelSnapshot {
            price,
            quantity,
            order_count: 1,
        }
    }

    fn snapshot_with(bids: Vec<LevelSnapshot>, asks: Vec<LevelSnapshot>) -> BookSnapshot {
        BookSnapshot {
            symbol: "TEST".to_string(),
            seq: 7,
            timestamp_ns: 0,
            bids,
            asks,
            last_trade_price: None,
            cumulative_volume: 0,
        }
    }

    #[test]
    fn test_best_and_mid() {
        let snapshot = snapshot_with(vec![level(99, 10)], vec![level(101, 5)]);
        assert_eq!(snapshot.best_bid(), Some((99, 10)));
        assert_eq!(snapshot.best_ask(), Some((101, 5)));
        assert_eq!(snapshot.mid_price(), Some(100.0));
        assert_eq!(snapshot.spread(), Some(2));
    }

    #[test]
    fn test_volumes() {
        let snapshot = snapshot_with(
            vec![level(99, 10), level(98, 20)],
            vec![level(101, 5)],
        );
        assert_eq!(snapshot.total_bid_volume(), 30);
        assert_eq!(snapshot.total_ask_volume(), 5);
    }

    #[test]
    fn test_package_round_trip() {
        let snapshot = snapshot_with(vec![level(99, 10)], vec![level(101, 5)]);
        let package = SnapshotPackage::new(snapshot).unwrap();
        let json = package.to_json().unwrap();
        let restored = SnapshotPackage::from_json(&json).unwrap();
        assert!(restored.validate().is_ok());
        let inner = restored.into_snapshot().unwrap();
        assert_eq!(inner.seq, 7);
    }

    #[test]
    fn test_package_detects_tampering() {
        let snapshot = snapshot_with(vec![level(99, 10)], vec![]);
        let mut package = SnapshotPackage::new(snapshot).unwrap();
        package.snapshot.bids[0].quantity = 999;
        assert!(matches!(
            package.validate(),
            Err(OrderBookError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_package_rejects_unknown_version() {
        let snapshot = snapshot_with(vec![], vec![]);
        let mut package = SnapshotPackage::new(snapshot).unwrap();
        package.version = 99;
        assert!(matches!(
            package.validate(),
            Err(OrderBookError::DeserializationError { .. })
        ));
    }

    #[test]
    fn test_enriched_metrics() {
        let enriched = EnrichedSnapshot::with_metrics(
            "TEST".to_string(),
            1,
            vec![level(99, 30), level(97, 30)],
            vec![level(101, 10)],
            MetricFlags::ALL,
        );
        assert_eq!(enriched.mid_price, Some(100.0));
        assert_eq!(enriched.bid_depth, 60);
        assert_eq!(enriched.ask_depth, 10);
        // (60 - 10) / 70
        assert!((enriched.imbalance - 50.0 / 70.0).abs() < 1e-9);
        // (99*30 + 97*30) / 60
        assert_eq!(enriched.vwap_bid, Some(98.0));
        assert_eq!(enriched.vwap_ask, Some(101.0));
        let spread_bps = enriched.spread_bps.unwrap();
        assert!((spread_bps - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_enriched_metric_selection() {
        let enriched = EnrichedSnapshot::with_metrics(
            "TEST".to_string(),
            1,
            vec![level(99, 30)],
            vec![level(101, 10)],
            MetricFlags::TOP_OF_BOOK,
        );
        assert_eq!(enriched.mid_price, Some(100.0));
        assert!(enriched.spread_bps.is_some());
        assert_eq!(enriched.bid_depth, 0);
        assert_eq!(enriched.vwap_bid, None);
        assert_eq!(enriched.imbalance, 0.0);
    }

    #[test]
    fn test_enriched_one_sided_book() {
        let enriched = EnrichedSnapshot::with_metrics(
            "TEST".to_string(),
            1,
            vec![level(99, 30)],
            vec![],
            MetricFlags::ALL,
        );
        assert_eq!(enriched.mid_price, None);
        assert_eq!(enriched.spread_bps, None);
        assert_eq!(enriched.bid_depth, 30);
        assert_eq!(enriched.ask_depth, 0);
        assert_eq!(enriched.vwap_ask, None);
        assert!((enriched.imbalance - 1.0).abs() < 1e-9);
    }
}
