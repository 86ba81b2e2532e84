//! Runtime configuration for the control loop.
//!
//! These are the structs the workers run on. They are separate from the
//! TOML-deserialized config in `rover_config`; see `conversions`.

use std::time::Duration;

use rover_traits::MotionCommand;

use crate::error::BuildError;
use crate::sample::ValidRange;

/// Largest hazard queue the controller accepts.
pub const MAX_QUEUE_CAPACITY: usize = 10;

/// Direction of the evasion turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnDirection {
    #[default]
    Left,
    Right,
}

impl TurnDirection {
    pub fn command(self) -> MotionCommand {
        match self {
            Self::Left => MotionCommand::RotateLeft,
            Self::Right => MotionCommand::RotateRight,
        }
    }
}

/// Sampler configuration.
#[derive(Debug, Clone)]
pub struct SamplerCfg {
    /// Time between ranging cycles.
    pub period: Duration,
    /// Max wait for one ranging cycle.
    pub sensor_timeout: Duration,
    pub valid_range: ValidRange,
    /// Valid readings strictly below this raise a hazard.
    pub hazard_threshold_cm: f64,
    pub queue_capacity: usize,
    /// Pause after a capability error.
    pub error_backoff: Duration,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(50),
            sensor_timeout: Duration::from_millis(100),
            valid_range: ValidRange::default(),
            hazard_threshold_cm: 15.0,
            queue_capacity: 1,
            error_backoff: Duration::from_millis(200),
        }
    }
}

/// Buzzer pulses emitted while evading.
#[derive(Debug, Clone, Copy)]
pub struct AlertCfg {
    pub pulses: u8,
    pub on: Duration,
    pub off: Duration,
}

impl Default for AlertCfg {
    fn default() -> Self {
        Self {
            pulses: 3,
            on: Duration::from_millis(80),
            off: Duration::from_millis(80),
        }
    }
}

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Hazard queue poll period.
    pub poll: Duration,
    /// Minimum spacing between two handled hazards.
    pub cooldown: Duration,
    pub turn_duration: Duration,
    pub turn_direction: TurnDirection,
    /// Reverse before turning; zero skips the step.
    pub reverse: Duration,
    /// Pause after the turn before advancing again; zero skips the step.
    pub settle: Duration,
    pub alert: AlertCfg,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(50),
            cooldown: Duration::from_secs(1),
            turn_duration: Duration::from_secs(1),
            turn_direction: TurnDirection::Left,
            reverse: Duration::from_millis(200),
            settle: Duration::from_millis(100),
            alert: AlertCfg::default(),
        }
    }
}

/// Supervisor and auxiliary worker configuration.
#[derive(Debug, Clone)]
pub struct SupervisorCfg {
    /// Overall budget for joining workers during teardown.
    pub join_timeout: Duration,
    pub status_period: Duration,
    pub infrared_period: Duration,
    /// Indicator blink half-period while advancing.
    pub indicator_period: Duration,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_millis(2000),
            status_period: Duration::from_millis(500),
            infrared_period: Duration::from_millis(100),
            indicator_period: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoverCfg {
    pub sampler: SamplerCfg,
    pub control: ControlCfg,
    pub supervisor: SupervisorCfg,
}

impl RoverCfg {
    /// Re-check the invariants the workers rely on.
    pub fn validate(&self) -> Result<(), BuildError> {
        let s = &self.sampler;
        if s.period.is_zero() {
            return Err(BuildError::InvalidConfig("sample period must be > 0"));
        }
        if s.sensor_timeout.is_zero() {
            return Err(BuildError::InvalidConfig("sensor timeout must be > 0"));
        }
        if ValidRange::new(s.valid_range.min_cm, s.valid_range.max_cm).is_none() {
            return Err(BuildError::InvalidConfig(
                "valid range must be finite with 0 <= min < max",
            ));
        }
        if !(s.hazard_threshold_cm > s.valid_range.min_cm
            && s.hazard_threshold_cm <= s.valid_range.max_cm)
        {
            return Err(BuildError::InvalidConfig(
                "hazard threshold must lie inside the valid range",
            ));
        }
        if !(1..=MAX_QUEUE_CAPACITY).contains(&s.queue_capacity) {
            return Err(BuildError::InvalidConfig("queue capacity must be in [1, 10]"));
        }

        let c = &self.control;
        if c.poll.is_zero() {
            return Err(BuildError::InvalidConfig("poll period must be > 0"));
        }
        if c.cooldown.is_zero() {
            return Err(BuildError::InvalidConfig("cooldown must be > 0"));
        }
        if c.turn_duration.is_zero() {
            return Err(BuildError::InvalidConfig("turn duration must be > 0"));
        }

        let v = &self.supervisor;
        if v.status_period.is_zero() {
            return Err(BuildError::InvalidConfig("status period must be > 0"));
        }
        if v.infrared_period.is_zero() || v.indicator_period.is_zero() {
            return Err(BuildError::InvalidConfig("auxiliary periods must be > 0"));
        }
        if v.join_timeout < self.shutdown_latency() {
            return Err(BuildError::InvalidConfig(
                "join timeout shorter than the worker shutdown latency",
            ));
        }
        Ok(())
    }

    /// Worst-case time for every worker to observe shutdown and exit. The
    /// auxiliary workers pause in `control.poll` slices, so the controller
    /// term covers them.
    pub fn shutdown_latency(&self) -> Duration {
        let controller = self.control.poll + crate::controller::max_step_duration(&self.control);
        let sampler = self.sampler.sensor_timeout + self.sampler.period.max(self.sampler.error_backoff);
        controller.max(sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(RoverCfg::default().validate(), Ok(()));
    }

    #[test]
    fn latency_covers_the_turn() {
        let cfg = RoverCfg::default();
        assert_eq!(
            cfg.shutdown_latency(),
            Duration::from_millis(50) + Duration::from_secs(1)
        );
    }

    #[test]
    fn latency_ignores_auxiliary_periods() {
        let mut cfg = RoverCfg::default();
        let before = cfg.shutdown_latency();
        cfg.supervisor.infrared_period = Duration::from_secs(30);
        cfg.supervisor.indicator_period = Duration::from_secs(30);
        assert_eq!(cfg.shutdown_latency(), before);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[rstest]
    #[case::zero_period(|c: &mut RoverCfg| c.sampler.period = Duration::ZERO)]
    #[case::inverted_range(|c: &mut RoverCfg| c.sampler.valid_range = ValidRange { min_cm: 250.0, max_cm: 2.0 })]
    #[case::threshold_outside(|c: &mut RoverCfg| c.sampler.hazard_threshold_cm = 300.0)]
    #[case::threshold_at_min(|c: &mut RoverCfg| c.sampler.hazard_threshold_cm = 2.0)]
    #[case::zero_queue(|c: &mut RoverCfg| c.sampler.queue_capacity = 0)]
    #[case::oversize_queue(|c: &mut RoverCfg| c.sampler.queue_capacity = 11)]
    #[case::zero_cooldown(|c: &mut RoverCfg| c.control.cooldown = Duration::ZERO)]
    #[case::short_join(|c: &mut RoverCfg| c.supervisor.join_timeout = Duration::from_millis(100))]
    fn invalid_configs_are_refused(#[case] tweak: fn(&mut RoverCfg)) {
        let mut cfg = RoverCfg::default();
        tweak(&mut cfg);
        assert!(matches!(cfg.validate(), Err(BuildError::InvalidConfig(_))));
    }
}
