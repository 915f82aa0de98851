//! Bounded lock-free FIFOs for intent and event ingress.
//!
//! Two variants share the same slot layout: [`SpscRing`] for the per-symbol
//! queues feeding a single matching worker, and [`MpscRing`] for the shared
//! ingress funnel in front of the dispatcher. Both are power-of-two sized,
//! allocate only at construction, and keep their counters on separate cache
//! lines.

mod mpsc;
mod spsc;

pub use mpsc::MpscRing;
pub use spsc::SpscRing;

use thiserror::Error;

/// Construction errors for the ring buffers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RingError {
    /// Ring capacities must be non-zero powers of two so index masking works.
    #[error("ring capacity {0} is not a non-zero power of two")]
    CapacityNotPowerOfTwo(usize),
}
