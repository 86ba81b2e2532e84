use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction shared by the sampler, controller and supervisor.
///
/// - now(): returns a monotonic Instant
/// - sleep(): suspends the calling thread for `d` (implementations may simulate)
/// - ms_since(): elapsed milliseconds from an epoch Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Real-time monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod manual {
    use super::*;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Deterministic clock whose time only moves when told to.
    ///
    /// now() = origin + offset. sleep(d) advances the offset by d and records
    /// the request, so tests can assert on maneuver timing without waiting.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        origin: Instant,
        inner: Arc<Mutex<Inner>>,
    }

    #[derive(Debug, Default)]
    struct Inner {
        offset: Duration,
        sleeps: Vec<Duration>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                inner: Arc::new(Mutex::new(Inner::default())),
            }
        }

        /// Move time forward without recording a sleep.
        pub fn advance(&self, d: Duration) {
            let mut g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            g.offset = g.offset.saturating_add(d);
        }

        /// Time elapsed since the clock was created.
        pub fn elapsed(&self) -> Duration {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .offset
        }

        /// Every duration passed to `sleep`, in call order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sleeps
                .clone()
        }

        /// Forget recorded sleeps (time is not rewound).
        pub fn clear_sleeps(&self) {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sleeps
                .clear();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            let mut g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            g.offset = g.offset.saturating_add(d);
            g.sleeps.push(d);
            drop(g);
            // Let other threads observe progress when a manual clock drives a loop.
            thread::yield_now();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn sleep_advances_and_records() {
            let c = ManualClock::new();
            let t0 = c.now();
            c.sleep(Duration::from_millis(30));
            c.advance(Duration::from_millis(20));
            assert_eq!(c.now() - t0, Duration::from_millis(50));
            assert_eq!(c.sleeps(), vec![Duration::from_millis(30)]);
            assert_eq!(c.ms_since(t0), 50);
        }
    }
}
