#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the rover.
//!
//! `Config` and its sections are deserialized from TOML and validated.
//! Every section carries defaults, so an empty file describes a working
//! rover with the stock Freenove-style wiring.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    /// HC-SR04 trigger output (BCM numbering)
    pub trig: u8,
    /// HC-SR04 echo input
    pub echo: u8,
    pub buzzer: Option<u8>,
    pub indicator: Option<u8>,
    pub ir_left: u8,
    pub ir_center: u8,
    pub ir_right: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            trig: 27,
            echo: 22,
            buzzer: Some(17),
            indicator: None,
            ir_left: 14,
            ir_center: 15,
            ir_right: 23,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplerCfg {
    /// Time between ranging cycles (ms)
    pub sample_period_ms: u64,
    /// Max wait for an echo per cycle (ms)
    pub sensor_timeout_ms: u64,
    /// Accepted readings, inclusive: [min, max] in cm
    pub valid_range_cm: [f64; 2],
    /// Readings strictly below this raise a hazard (cm)
    pub hazard_threshold_cm: f64,
    /// Pending hazard slots
    pub queue_capacity: usize,
    /// Pause after a sensor fault before the next cycle (ms)
    pub error_backoff_ms: u64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            sample_period_ms: 50,
            sensor_timeout_ms: 100,
            valid_range_cm: [2.0, 250.0],
            hazard_threshold_cm: 15.0,
            queue_capacity: 1,
            error_backoff_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    /// Hazard queue poll period (ms)
    pub poll_ms: u64,
    /// Minimum time between two evasions (s)
    pub cooldown_s: f64,
    /// Rotation time approximating a 90 degree turn (s)
    pub turn_duration_s: f64,
    pub turn_direction: Turn,
    /// Reverse before turning (ms); 0 skips the step
    pub reverse_ms: u64,
    /// Pause after the turn before advancing again (ms)
    pub settle_ms: u64,
    pub alert_pulses: u8,
    pub alert_on_ms: u64,
    pub alert_off_ms: u64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            poll_ms: 50,
            cooldown_s: 1.0,
            turn_duration_s: 1.0,
            turn_direction: Turn::Left,
            reverse_ms: 200,
            settle_ms: 100,
            alert_pulses: 3,
            alert_on_ms: 80,
            alert_off_ms: 80,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MotionCfg {
    /// PCA9685 duty (0..=4095) for each wheel when advancing
    pub advance_duty: u16,
    pub reverse_duty: u16,
    pub turn_duty: u16,
    pub pwm_freq_hz: u16,
    pub i2c_address: u16,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            advance_duty: 1000,
            reverse_duty: 1000,
            turn_duty: 1000,
            pwm_freq_hz: 50,
            i2c_address: 0x40,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SupervisorCfg {
    /// Max wait for each worker thread during teardown (ms)
    pub join_timeout_ms: u64,
    /// Status log period while running (ms)
    pub status_period_ms: u64,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            join_timeout_ms: 2000,
            status_period_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InfraredCfg {
    pub enabled: bool,
    pub period_ms: u64,
}

impl Default for InfraredCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            period_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndicatorCfg {
    pub enabled: bool,
    /// Blink half-period while advancing (ms); evading blinks four times faster
    pub period_ms: u64,
}

impl Default for IndicatorCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            period_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pins: Pins,
    pub sampler: SamplerCfg,
    pub control: ControlCfg,
    pub motion: MotionCfg,
    pub supervisor: SupervisorCfg,
    pub infrared: InfraredCfg,
    pub indicator: IndicatorCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

const MAX_DUTY: u16 = 4095;

/// At least one millisecond, so the runtime never sees a zero duration.
fn positive_secs(v: f64) -> bool {
    v.is_finite() && v >= 0.001
}

impl Config {
    /// Worst-case time for the workers to notice shutdown: one poll plus the
    /// longest maneuver step, or one sensor cycle plus its pause. Infrared
    /// and indicator workers check shutdown every poll, so their periods do
    /// not add to it.
    pub fn shutdown_latency_ms(&self) -> u64 {
        let c = &self.control;
        let s = &self.sampler;
        let turn_ms = std::time::Duration::try_from_secs_f64(c.turn_duration_s).map_or(0, |d| {
            u64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
        });
        let longest_step = [turn_ms, c.reverse_ms, c.settle_ms, c.alert_on_ms, c.alert_off_ms]
            .into_iter()
            .max()
            .unwrap_or(0);
        let controller = c.poll_ms.saturating_add(longest_step);
        let sampler = s
            .sensor_timeout_ms
            .saturating_add(s.sample_period_ms.max(s.error_backoff_ms));
        controller.max(sampler)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Sampler
        let s = &self.sampler;
        if s.sample_period_ms == 0 {
            eyre::bail!("sampler.sample_period_ms must be > 0");
        }
        if s.sensor_timeout_ms == 0 {
            eyre::bail!("sampler.sensor_timeout_ms must be > 0");
        }
        let [min, max] = s.valid_range_cm;
        if !(min.is_finite() && max.is_finite()) || min < 0.0 {
            eyre::bail!("sampler.valid_range_cm must be finite and >= 0");
        }
        if min >= max {
            eyre::bail!("sampler.valid_range_cm min must be < max (got [{min}, {max}])");
        }
        if !s.hazard_threshold_cm.is_finite()
            || s.hazard_threshold_cm <= min
            || s.hazard_threshold_cm > max
        {
            eyre::bail!("sampler.hazard_threshold_cm must lie in (min, max] of valid_range_cm");
        }
        if !(1..=10).contains(&s.queue_capacity) {
            eyre::bail!("sampler.queue_capacity must be in [1, 10]");
        }

        // Control
        let c = &self.control;
        if c.poll_ms == 0 {
            eyre::bail!("control.poll_ms must be > 0");
        }
        if !positive_secs(c.cooldown_s) {
            eyre::bail!("control.cooldown_s must be > 0");
        }
        if !positive_secs(c.turn_duration_s) {
            eyre::bail!("control.turn_duration_s must be > 0");
        }
        if c.turn_duration_s > 10.0 {
            eyre::bail!("control.turn_duration_s is unreasonably large (>10s)");
        }
        if c.cooldown_s > 3600.0 {
            eyre::bail!("control.cooldown_s is unreasonably large (>1h)");
        }
        if c.reverse_ms > 5_000 {
            eyre::bail!("control.reverse_ms is unreasonably large (>5s)");
        }
        if c.alert_pulses > 0 && (c.alert_on_ms == 0 || c.alert_off_ms == 0) {
            eyre::bail!("control.alert_on_ms and alert_off_ms must be > 0 when alert_pulses > 0");
        }

        // Motion
        let m = &self.motion;
        for (name, duty) in [
            ("advance_duty", m.advance_duty),
            ("reverse_duty", m.reverse_duty),
            ("turn_duty", m.turn_duty),
        ] {
            if duty == 0 || duty > MAX_DUTY {
                eyre::bail!("motion.{name} must be in [1, {MAX_DUTY}]");
            }
        }
        if m.pwm_freq_hz == 0 {
            eyre::bail!("motion.pwm_freq_hz must be > 0");
        }

        // Supervisor
        if self.supervisor.join_timeout_ms == 0 {
            eyre::bail!("supervisor.join_timeout_ms must be > 0");
        }
        if self.supervisor.status_period_ms == 0 {
            eyre::bail!("supervisor.status_period_ms must be > 0");
        }
        let latency = self.shutdown_latency_ms();
        if self.supervisor.join_timeout_ms < latency {
            eyre::bail!(
                "supervisor.join_timeout_ms must cover the worker shutdown latency ({latency} ms)"
            );
        }

        // Auxiliary workers
        if self.infrared.period_ms == 0 {
            eyre::bail!("infrared.period_ms must be > 0");
        }
        if self.indicator.period_ms == 0 {
            eyre::bail!("indicator.period_ms must be > 0");
        }
        if self.indicator.enabled && self.pins.indicator.is_none() {
            eyre::bail!("indicator.enabled requires pins.indicator");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
