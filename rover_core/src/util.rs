//! Common time helpers for rover_core.

use std::time::{Duration, Instant};

/// Duration from a config value in seconds. Non-finite or negative values
/// map to zero so validation can reject them with a single check.
#[inline]
pub fn secs(v: f64) -> Duration {
    Duration::try_from_secs_f64(v).unwrap_or(Duration::ZERO)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn as_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Earliest of `a` and an optional `b`.
#[inline]
pub fn earliest(a: Instant, b: Option<Instant>) -> Instant {
    match b {
        Some(b) if b < a => b,
        _ => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_rejects_garbage() {
        assert_eq!(secs(1.5), Duration::from_millis(1500));
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn earliest_picks_min() {
        let now = Instant::now();
        let later = now + Duration::from_millis(5);
        assert_eq!(earliest(later, Some(now)), now);
        assert_eq!(earliest(now, Some(later)), now);
        assert_eq!(earliest(now, None), now);
    }
}
