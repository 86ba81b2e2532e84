//! `From` implementations bridging `rover_config` types to `rover_core` types.

use std::time::Duration;

use crate::config::{AlertCfg, ControlCfg, RoverCfg, SamplerCfg, SupervisorCfg, TurnDirection};
use crate::sample::ValidRange;
use crate::util::secs;

// ── SamplerCfg ───────────────────────────────────────────────────────────────

impl From<&rover_config::SamplerCfg> for SamplerCfg {
    fn from(c: &rover_config::SamplerCfg) -> Self {
        let [min_cm, max_cm] = c.valid_range_cm;
        Self {
            period: Duration::from_millis(c.sample_period_ms),
            sensor_timeout: Duration::from_millis(c.sensor_timeout_ms),
            valid_range: ValidRange { min_cm, max_cm },
            hazard_threshold_cm: c.hazard_threshold_cm,
            queue_capacity: c.queue_capacity,
            error_backoff: Duration::from_millis(c.error_backoff_ms),
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<rover_config::Turn> for TurnDirection {
    fn from(t: rover_config::Turn) -> Self {
        match t {
            rover_config::Turn::Left => Self::Left,
            rover_config::Turn::Right => Self::Right,
        }
    }
}

impl From<&rover_config::ControlCfg> for ControlCfg {
    fn from(c: &rover_config::ControlCfg) -> Self {
        Self {
            poll: Duration::from_millis(c.poll_ms),
            cooldown: secs(c.cooldown_s),
            turn_duration: secs(c.turn_duration_s),
            turn_direction: c.turn_direction.into(),
            reverse: Duration::from_millis(c.reverse_ms),
            settle: Duration::from_millis(c.settle_ms),
            alert: AlertCfg {
                pulses: c.alert_pulses,
                on: Duration::from_millis(c.alert_on_ms),
                off: Duration::from_millis(c.alert_off_ms),
            },
        }
    }
}

// ── RoverCfg ─────────────────────────────────────────────────────────────────

impl From<&rover_config::Config> for RoverCfg {
    fn from(c: &rover_config::Config) -> Self {
        Self {
            sampler: (&c.sampler).into(),
            control: (&c.control).into(),
            supervisor: SupervisorCfg {
                join_timeout: Duration::from_millis(c.supervisor.join_timeout_ms),
                status_period: Duration::from_millis(c.supervisor.status_period_ms),
                infrared_period: Duration::from_millis(c.infrared.period_ms),
                indicator_period: Duration::from_millis(c.indicator.period_ms),
            },
        }
    }
}
