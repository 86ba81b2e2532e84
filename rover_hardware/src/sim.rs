//! Simulated backends used when the `hardware` feature is off.

use std::time::Duration;

use rover_traits::{AuxSensor, BoxError, DriveTrain, MotionCommand, RangeSensor, Signal};

use crate::drive::{DutyProfile, wheel_duties};
use crate::error::HwError;

/// Range sensor that models the rover closing in on a wall.
///
/// Each sample moves `step_cm` closer; once the distance falls below
/// `floor_cm` it jumps back to `start_cm`, as if the rover had turned away.
/// Every `no_echo_every`-th cycle reports the sensor's 300 cm "no echo" value.
#[derive(Debug, Clone)]
pub struct SimulatedRangeSensor {
    start_cm: f64,
    step_cm: f64,
    floor_cm: f64,
    current_cm: f64,
    no_echo_every: Option<u32>,
    cycles: u32,
}

impl Default for SimulatedRangeSensor {
    fn default() -> Self {
        Self::new(120.0, 3.0)
    }
}

impl SimulatedRangeSensor {
    pub fn new(start_cm: f64, step_cm: f64) -> Self {
        Self {
            start_cm,
            step_cm,
            floor_cm: 4.0,
            current_cm: start_cm,
            no_echo_every: Some(7),
            cycles: 0,
        }
    }

    pub fn with_floor(mut self, floor_cm: f64) -> Self {
        self.floor_cm = floor_cm;
        self
    }

    pub fn with_no_echo_every(mut self, n: Option<u32>) -> Self {
        self.no_echo_every = n.filter(|n| *n > 0);
        self
    }
}

impl RangeSensor for SimulatedRangeSensor {
    fn sample(&mut self, _timeout: Duration) -> Result<Option<f64>, BoxError> {
        self.cycles = self.cycles.wrapping_add(1);
        if let Some(n) = self.no_echo_every
            && self.cycles % n == 0
        {
            return Ok(Some(300.0));
        }
        let d = self.current_cm;
        self.current_cm -= self.step_cm;
        if self.current_cm < self.floor_cm {
            self.current_cm = self.start_cm;
        }
        tracing::trace!(distance_cm = d, "sim range sample");
        Ok(Some(d))
    }
}

/// Drive train that logs wheel duties instead of driving pins.
#[derive(Debug, Default)]
pub struct SimulatedDriveTrain {
    profile: DutyProfile,
    last: Option<MotionCommand>,
    commands: usize,
    fail_after: Option<usize>,
}

impl SimulatedDriveTrain {
    pub fn new(profile: DutyProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// Fail every command after the first `n` succeeded.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn last_command(&self) -> Option<MotionCommand> {
        self.last
    }
}

impl DriveTrain for SimulatedDriveTrain {
    fn drive(&mut self, cmd: MotionCommand) -> Result<(), BoxError> {
        if self.fail_after.is_some_and(|n| self.commands >= n) {
            return Err(Box::new(HwError::Simulated("drive train not responding")));
        }
        self.commands += 1;
        self.last = Some(cmd);
        let duties = wheel_duties(cmd, &self.profile);
        tracing::debug!(%cmd, ?duties, "sim drive");
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), BoxError> {
        self.last = Some(MotionCommand::Stop);
        tracing::debug!("sim drive disarmed");
        Ok(())
    }
}

/// Buzzer or LED that only logs.
#[derive(Debug, Default)]
pub struct SimulatedSignal {
    name: &'static str,
    on: bool,
}

impl SimulatedSignal {
    pub fn new(name: &'static str) -> Self {
        Self { name, on: false }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Signal for SimulatedSignal {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        self.on = on;
        tracing::trace!(signal = self.name, on, "sim signal");
        Ok(())
    }
}

/// Infrared tracker that walks through the three-sensor bit patterns.
#[derive(Debug, Default)]
pub struct SimulatedInfrared {
    n: u8,
}

impl AuxSensor for SimulatedInfrared {
    fn read(&mut self) -> Result<u8, BoxError> {
        let v = self.n & 0b111;
        self.n = self.n.wrapping_add(1);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_sensor_approaches_then_resets() {
        let mut s = SimulatedRangeSensor::new(10.0, 3.0)
            .with_floor(4.0)
            .with_no_echo_every(None);
        let t = Duration::from_millis(1);
        let got: Vec<f64> = (0..4)
            .map(|_| s.sample(t).unwrap().unwrap())
            .collect();
        assert_eq!(got, vec![10.0, 7.0, 4.0, 10.0]);
    }

    #[test]
    fn range_sensor_injects_no_echo() {
        let mut s = SimulatedRangeSensor::new(100.0, 1.0).with_no_echo_every(Some(2));
        let t = Duration::from_millis(1);
        assert_eq!(s.sample(t).unwrap(), Some(100.0));
        assert_eq!(s.sample(t).unwrap(), Some(300.0));
    }

    #[test]
    fn drive_train_fault_injection() {
        let mut d = SimulatedDriveTrain::default().failing_after(1);
        d.drive(MotionCommand::Advance).unwrap();
        assert_eq!(d.last_command(), Some(MotionCommand::Advance));
        let err = d.drive(MotionCommand::Stop).unwrap_err();
        assert!(err.to_string().contains("not responding"));
        d.disarm().unwrap();
        assert_eq!(d.last_command(), Some(MotionCommand::Stop));
    }

    #[test]
    fn signal_tracks_state() {
        let mut s = SimulatedSignal::new("buzzer");
        s.set(true).unwrap();
        assert!(s.is_on());
        s.close().unwrap();
        assert!(!s.is_on());
    }
}
