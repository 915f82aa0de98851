//! Ring-bucketed order-rate counters.
//!
//! Sixty one-second buckets cover the sliding minute. Each bucket carries
//! the epoch second it was written for; a bucket whose tag is stale is
//! treated as zero and overwritten on the next admission in its slot, so
//! rolling the window costs nothing. Counts are monotone within a bucket.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const BUCKETS: usize = 60;

/// Which sliding window a rate refusal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateWindow {
    /// The current sliding second.
    PerSecond,
    /// The current sliding minute.
    PerMinute,
}

impl std::fmt::Display for RateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateWindow::PerSecond => write!(f, "per-second"),
            RateWindow::PerMinute => write!(f, "per-minute"),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    epoch_s: AtomicU64,
    count: AtomicU32,
}

/// Order-rate counters for one account or strategy.
#[derive(Debug)]
pub struct RateWindowCounters {
    buckets: [Bucket; BUCKETS],
}

impl RateWindowCounters {
    /// Create counters with every bucket empty.
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| Bucket {
                epoch_s: AtomicU64::new(u64::MAX),
                count: AtomicU32::new(0),
            }),
        }
    }

    /// Admit one order at `now_s` (epoch seconds) if both windows stay at or
    /// under their caps; on success the current bucket is incremented.
    ///
    /// # Errors
    /// Returns the window that would overflow, the observed count including
    /// this order, and the cap.
    pub fn try_admit(
        &self,
        now_s: u64,
        per_second_cap: u32,
        per_minute_cap: u32,
    ) -> Result<(), (RateWindow, u32, u32)> {
        let slot = (now_s % BUCKETS as u64) as usize;
        let bucket = &self.buckets[slot];

        // Roll the slot to the current second when its tag is stale.
        if bucket.epoch_s.load(Ordering::Acquire) != now_s {
            bucket.count.store(0, Ordering::Release);
            bucket.epoch_s.store(now_s, Ordering::Release);
        }

        let second_count = bucket.count.load(Ordering::Acquire).saturating_add(1);
        if second_count > per_second_cap {
            return Err((RateWindow::PerSecond, second_count, per_second_cap));
        }

        let minute_count = self.count_last_minute(now_s).saturating_add(1);
        if minute_count > per_minute_cap {
            return Err((RateWindow::PerMinute, minute_count, per_minute_cap));
        }

        bucket.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Orders admitted in the sliding minute ending at `now_s`.
    #[must_use]
    pub fn count_last_minute(&self, now_s: u64) -> u32 {
        let oldest = now_s.saturating_sub(BUCKETS as u64 - 1);
        let mut total = 0u32;
        for bucket in &self.buckets {
            let tag = bucket.epoch_s.load(Ordering::Acquire);
            if tag >= oldest && tag <= now_s {
                total = total.saturating_add(bucket.count.load(Ordering::Acquire));
            }
        }
        total
    }

    /// Orders admitted in the second `now_s`.
    #[must_use]
    pub fn count_this_second(&self, now_s: u64) -> u32 {
        let bucket = &self.buckets[(now_s % BUCKETS as u64) as usize];
        if bucket.epoch_s.load(Ordering::Acquire) == now_s {
            bucket.count.load(Ordering::Acquire)
        } else {
            0
        }
    }
}

impl Default for RateWindowCounters {
    fn default() -> Self {
        Self::new()
    }
}
