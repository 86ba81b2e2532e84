//! Echo-time to distance conversion for ultrasonic rangers.

use std::time::Duration;

/// Speed of sound at ~20 °C in centimeters per second.
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34_300.0;

/// Width of the HC-SR04 trigger pulse.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Convert a round-trip echo pulse width to a one-way distance in cm,
/// rounded to two decimals.
pub fn echo_to_cm(echo: Duration) -> f64 {
    let cm = echo.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0;
    (cm * 100.0).round() / 100.0
}
