//! Maps `Box<dyn Error>` from capability boundaries to typed `RoverError`.
//!
//! The traits in `rover_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `rover_hardware::HwError` downcasting.

use crate::error::RoverError;

/// Map a range-sensor error. Timeouts stay distinguishable from other faults.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> RoverError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<rover_hardware::HwError>() {
            return match hw {
                rover_hardware::HwError::EchoTimeout | rover_hardware::HwError::LevelTimeout => {
                    RoverError::SensorTimeout
                }
                other => RoverError::Sensor(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        RoverError::SensorTimeout
    } else {
        RoverError::Sensor(s)
    }
}

/// Map a drive-train or signaling error. Every actuator error is a fault.
pub fn map_actuator_error(e: &(dyn std::error::Error + 'static)) -> RoverError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<rover_hardware::HwError>() {
            return RoverError::ActuatorFault(hw.to_string());
        }
    }
    RoverError::ActuatorFault(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_timeout_detected_from_message() {
        let e: Box<dyn std::error::Error + Send + Sync> = "echo Timeout".into();
        assert_eq!(map_sensor_error(&*e), RoverError::SensorTimeout);
    }

    #[test]
    fn other_sensor_errors_keep_message() {
        let e: Box<dyn std::error::Error + Send + Sync> = "gpio busy".into();
        assert_eq!(map_sensor_error(&*e), RoverError::Sensor("gpio busy".into()));
    }

    #[test]
    fn actuator_errors_are_faults() {
        let e: Box<dyn std::error::Error + Send + Sync> = "i2c nack".into();
        assert_eq!(
            map_actuator_error(&*e),
            RoverError::ActuatorFault("i2c nack".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_timeout_is_downcast() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(rover_hardware::HwError::EchoTimeout);
        assert_eq!(map_sensor_error(&*e), RoverError::SensorTimeout);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_fault_keeps_its_message() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(rover_hardware::HwError::I2c("bus busy".into()));
        assert_eq!(
            map_actuator_error(&*e),
            RoverError::ActuatorFault("i2c error: bus busy".into())
        );
        assert_eq!(map_sensor_error(&*e), RoverError::Sensor("i2c error: bus busy".into()));
    }
}
