use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait while `holds` stays true, or until `timeout` expires.
///
/// Returns the instant at which the predicate was first observed false.
/// A zero `poll_interval` spins, which the echo timer needs for centimeter
/// resolution; anything larger sleeps between polls.
pub fn wait_while_with_timeout(
    mut holds: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if !holds() {
            return Ok(now);
        }
        if now >= deadline {
            return Err(HwError::LevelTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}
