//! Time helpers.
//!
//! Wall-clock timestamps are descriptive only; ordering truth is always the
//! per-book sequence number. The monotonic clock is anchored at first use so
//! timestamps are comparable within a process.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static CLOCK_ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Milliseconds since the Unix epoch on the wall clock.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Nanoseconds on the process-local monotonic clock.
///
/// Never goes backwards; unrelated to the wall clock.
pub fn monotonic_nanos() -> u64 {
    let anchor = CLOCK_ANCHOR.get_or_init(Instant::now);
    anchor.elapsed().as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_decreases() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
    }

    #[test]
    fn test_wall_clock_is_past_2020() {
        assert!(current_time_millis() > 1_577_836_800_000);
    }
}
