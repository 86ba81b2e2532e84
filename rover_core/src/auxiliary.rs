//! Auxiliary workers: infrared tracker polling and the indicator LED.

use std::time::Duration;

use rover_traits::{AuxSensor, Clock, Signal};

use crate::error::Result;
use crate::shared_state::SharedState;
use crate::shutdown::ShutdownSignal;
use crate::status::ControllerState;

/// Closes the wrapped sensor when the loop ends, however it ends.
struct AuxGuard(Box<dyn AuxSensor + Send>);

impl Drop for AuxGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            tracing::warn!(error = %e, "infrared close failed");
        }
    }
}

/// Switches the indicator off when the loop ends, however it ends.
struct IndicatorGuard(Box<dyn Signal + Send>);

impl Drop for IndicatorGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            tracing::warn!(error = %e, "indicator close failed");
        }
    }
}

/// Sleep `total` in slices of at most `tick`, stopping early on shutdown.
/// Returns true when the whole pause elapsed.
pub fn pause_unless_shutdown(
    clock: &dyn Clock,
    shutdown: &ShutdownSignal,
    total: Duration,
    tick: Duration,
) -> bool {
    if tick.is_zero() {
        clock.sleep(total);
        return !shutdown.is_triggered();
    }
    let mut left = total;
    while !left.is_zero() {
        if shutdown.is_triggered() {
            return false;
        }
        let slice = left.min(tick);
        clock.sleep(slice);
        left -= slice;
    }
    true
}

/// Poll the infrared tracker into `SharedState` every `period`. Shutdown is
/// noticed within one `tick`.
pub fn run_infrared(
    sensor: Box<dyn AuxSensor + Send>,
    shared: &SharedState,
    clock: &dyn Clock,
    shutdown: &ShutdownSignal,
    period: Duration,
    tick: Duration,
) -> Result<()> {
    let mut guard = AuxGuard(sensor);
    while !shutdown.is_triggered() {
        match guard.0.read() {
            Ok(bits) => shared.set_infrared(bits),
            Err(e) => tracing::warn!(error = %e, "infrared read failed"),
        }
        pause_unless_shutdown(clock, shutdown, period, tick);
    }
    tracing::trace!("infrared thread exiting cleanly");
    Ok(())
}

/// Blink half-period for the current controller state.
pub fn blink_period(base: Duration, state: ControllerState) -> Duration {
    match state {
        ControllerState::Evading => base / 4,
        ControllerState::Advancing | ControllerState::ShuttingDown => base,
    }
}

/// Heartbeat blink; four times faster while evading. Always ends dark.
pub fn run_indicator(
    led: Box<dyn Signal + Send>,
    shared: &SharedState,
    clock: &dyn Clock,
    shutdown: &ShutdownSignal,
    period: Duration,
    tick: Duration,
) -> Result<()> {
    let mut guard = IndicatorGuard(led);
    let mut on = false;
    while !shutdown.is_triggered() {
        on = !on;
        if let Err(e) = guard.0.set(on) {
            tracing::warn!(error = %e, "indicator set failed");
        }
        let half = blink_period(period, shared.snapshot().controller);
        pause_unless_shutdown(clock, shutdown, half, tick);
    }
    tracing::trace!("indicator thread exiting cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingSignal;
    use rover_traits::BoxError;
    use rover_traits::clock::manual::ManualClock;

    struct StopAfter {
        reads: u8,
        shutdown: ShutdownSignal,
    }

    impl AuxSensor for StopAfter {
        fn read(&mut self) -> std::result::Result<u8, BoxError> {
            self.reads += 1;
            if self.reads == 3 {
                self.shutdown.trigger();
            }
            Ok(self.reads)
        }
    }

    #[test]
    fn infrared_value_lands_in_shared_state() {
        let shutdown = ShutdownSignal::new();
        let shared = SharedState::new();
        let sensor = StopAfter {
            reads: 0,
            shutdown: shutdown.clone(),
        };
        run_infrared(
            Box::new(sensor),
            &shared,
            &ManualClock::new(),
            &shutdown,
            Duration::from_millis(100),
            Duration::from_millis(50),
        )
        .expect("infrared loop");
        assert_eq!(shared.snapshot().infrared, 3);
    }

    #[test]
    fn evading_blinks_faster() {
        let base = Duration::from_millis(400);
        assert_eq!(blink_period(base, ControllerState::Advancing), base);
        assert_eq!(
            blink_period(base, ControllerState::Evading),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn indicator_ends_dark() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let (led, log) = RecordingSignal::new();
        run_indicator(
            Box::new(led),
            &SharedState::new(),
            &ManualClock::new(),
            &shutdown,
            Duration::from_millis(500),
            Duration::from_millis(50),
        )
        .expect("indicator loop");
        assert_eq!(log.last(), Some(false));
    }

    #[test]
    fn long_pause_is_sliced_by_tick() {
        let clock = ManualClock::new();
        let done = pause_unless_shutdown(
            &clock,
            &ShutdownSignal::new(),
            Duration::from_millis(120),
            Duration::from_millis(50),
        );
        assert!(done);
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_millis(50),
                Duration::from_millis(50),
                Duration::from_millis(20)
            ]
        );
    }

    #[test]
    fn pause_stops_at_shutdown() {
        let clock = ManualClock::new();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        assert!(!pause_unless_shutdown(
            &clock,
            &shutdown,
            Duration::from_secs(5),
            Duration::from_millis(50)
        ));
        assert!(clock.sleeps().is_empty());
    }

    struct ShutdownOnSecondRead {
        reads: u8,
        shutdown: ShutdownSignal,
    }

    impl AuxSensor for ShutdownOnSecondRead {
        fn read(&mut self) -> std::result::Result<u8, BoxError> {
            self.reads += 1;
            if self.reads == 2 {
                self.shutdown.trigger();
            }
            Ok(0)
        }
    }

    #[test]
    fn slow_infrared_period_does_not_delay_exit() {
        let shutdown = ShutdownSignal::new();
        let clock = ManualClock::new();
        let sensor = ShutdownOnSecondRead {
            reads: 0,
            shutdown: shutdown.clone(),
        };
        run_infrared(
            Box::new(sensor),
            &SharedState::new(),
            &clock,
            &shutdown,
            Duration::from_secs(5),
            Duration::from_millis(50),
        )
        .expect("infrared loop");
        // One full period after the first read, nothing after the second.
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert!(clock.sleeps().iter().all(|d| *d <= Duration::from_millis(50)));
    }
}
