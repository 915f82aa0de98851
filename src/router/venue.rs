//! Venue descriptors: what the router knows about each destination.

use super::fees::FeeSchedule;
use crate::core::Side;
use serde::{Deserialize, Serialize};

/// What kind of destination a venue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenueKind {
    /// A lit exchange with displayed liquidity.
    LitExchange,
    /// An electronic communication network.
    Ecn,
    /// A crossing network.
    CrossingNetwork,
    /// A dark pool; liquidity is an opaque estimate.
    DarkPool,
}

/// A venue's current top of book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueQuote {
    /// Best bid price in ticks.
    pub bid_price: u64,
    /// Size at the best bid, in lots.
    pub bid_size: u64,
    /// Best ask price in ticks.
    pub ask_price: u64,
    /// Size at the best ask, in lots.
    pub ask_size: u64,
    /// Wall-clock time of the last update, milliseconds.
    pub updated_ms: u64,
}

/// Everything the router knows about one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDescriptor {
    /// Venue identifier.
    pub venue_id: String,
    /// Venue kind.
    pub kind: VenueKind,
    /// Whether the venue connection is up.
    pub connected: bool,
    /// Latest top of book, if any has been received.
    pub quote: Option<VenueQuote>,
    /// Reliability score in [0, 1].
    pub reliability: f64,
    /// Historical fill rate in [0, 1].
    pub fill_rate: f64,
    /// Average round-trip latency in microseconds.
    pub avg_latency_us: u64,
    /// Smallest order the venue accepts, in lots.
    pub min_order_size: u64,
    /// Largest order the venue accepts, in lots.
    pub max_order_size: u64,
    /// Venue tick size.
    pub tick_size: u64,
    /// Venue fee schedule.
    pub fees: FeeSchedule,
    /// Opaque hidden-liquidity estimate for dark pools, in lots.
    pub hidden_liquidity: u64,
}

impl VenueDescriptor {
    /// Whether this venue is a dark pool.
    #[must_use]
    #[inline]
    pub fn is_dark(&self) -> bool {
        self.kind == VenueKind::DarkPool
    }

    /// Executable price and displayed size for an aggressor on `side`:
    /// the ask for buyers, the bid for sellers. `None` without a quote.
    #[must_use]
    pub fn executable(&self, side: Side) -> Option<(u64, u64)> {
        let quote = self.quote?;
        match side {
            Side::Buy => Some((quote.ask_price, quote.ask_size)),
            Side::Sell => Some((quote.bid_price, quote.bid_size)),
        }
    }

    /// Whether the quote is fresh enough to route on.
    #[must_use]
    pub fn quote_fresh(&self, now_ms: u64, cache_timeout_ms: u64) -> bool {
        self.quote
            .is_some_and(|quote| now_ms.saturating_sub(quote.updated_ms) <= cache_timeout_ms)
    }

    /// Mid price of the venue quote.
    #[must_use]
    pub fn mid_price(&self) -> Option<u64> {
        self.quote
            .map(|quote| quote.bid_price.midpoint(quote.ask_price))
    }
}
