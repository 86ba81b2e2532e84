//! Command implementations: backend selection, `run`, `self-check`, `health`.

use std::time::{Duration, Instant};

use eyre::WrapErr;
use rover_config::Config;
use rover_core::hw_error::map_sensor_error;
use rover_core::{RoverCfg, ShutdownSignal, Supervisor};
use rover_hardware::DutyProfile;
use rover_traits::{AuxSensor, DriveTrain, RangeSensor, Signal};
use serde_json::json;

/// Test hook: reach an obstacle every N simulated samples.
const ENV_SIM_OBSTACLE_EVERY: &str = "ROVER_TEST_SIM_OBSTACLE_EVERY";
/// Test hook: the simulated drive train fails after its first command.
const ENV_SIM_ACTUATOR_FAULT: &str = "ROVER_TEST_SIM_ACTUATOR_FAULT";

const SIM_START_CM: f64 = 120.0;
const SIM_FLOOR_CM: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Simulated,
    Hardware,
}

impl BackendKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Hardware => "hardware",
        }
    }
}

/// Every capability the rover was given, boxed.
pub struct Backend {
    pub kind: BackendKind,
    pub sensor: Box<dyn RangeSensor + Send>,
    pub drive: Box<dyn DriveTrain + Send>,
    pub buzzer: Option<Box<dyn Signal + Send>>,
    pub indicator: Option<Box<dyn Signal + Send>>,
    pub infrared: Option<Box<dyn AuxSensor + Send>>,
}

fn duty_profile(cfg: &Config) -> DutyProfile {
    DutyProfile {
        advance: cfg.motion.advance_duty,
        reverse: cfg.motion.reverse_duty,
        turn: cfg.motion.turn_duty,
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn simulated_backend(cfg: &Config) -> Backend {
    use rover_hardware::{
        SimulatedDriveTrain, SimulatedInfrared, SimulatedRangeSensor, SimulatedSignal,
    };

    let sensor = match std::env::var(ENV_SIM_OBSTACLE_EVERY)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
    {
        Some(n) => SimulatedRangeSensor::new(SIM_START_CM, (SIM_START_CM - SIM_FLOOR_CM) / f64::from(n))
            .with_floor(SIM_FLOOR_CM)
            .with_no_echo_every(None),
        None => SimulatedRangeSensor::default(),
    };

    let mut drive = SimulatedDriveTrain::new(duty_profile(cfg));
    if env_flag(ENV_SIM_ACTUATOR_FAULT) {
        drive = drive.failing_after(1);
    }

    Backend {
        kind: BackendKind::Simulated,
        sensor: Box::new(sensor),
        drive: Box::new(drive),
        buzzer: cfg
            .pins
            .buzzer
            .map(|_| Box::new(SimulatedSignal::new("buzzer")) as Box<dyn Signal + Send>),
        indicator: cfg
            .indicator
            .enabled
            .then(|| Box::new(SimulatedSignal::new("indicator")) as Box<dyn Signal + Send>),
        infrared: cfg
            .infrared
            .enabled
            .then(|| Box::new(SimulatedInfrared::default()) as Box<dyn AuxSensor + Send>),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn hardware_backend(cfg: &Config) -> eyre::Result<Backend> {
    use rover_hardware::hardware::{FourWheelDrive, GpioInfrared, GpioSignal, HcSr04};

    let p = &cfg.pins;
    let sensor = HcSr04::new(p.trig, p.echo)
        .wrap_err_with(|| format!("open HC-SR04 (trig={}, echo={})", p.trig, p.echo))?;
    let drive = FourWheelDrive::new(
        cfg.motion.i2c_address,
        cfg.motion.pwm_freq_hz,
        duty_profile(cfg),
    )
    .wrap_err_with(|| format!("open PCA9685 at {:#04x}", cfg.motion.i2c_address))?;

    let buzzer = match p.buzzer {
        Some(pin) => Some(Box::new(
            GpioSignal::new(pin).wrap_err_with(|| format!("open buzzer pin {pin}"))?,
        ) as Box<dyn Signal + Send>),
        None => None,
    };
    let indicator = match (cfg.indicator.enabled, p.indicator) {
        (true, Some(pin)) => Some(Box::new(
            GpioSignal::new(pin).wrap_err_with(|| format!("open indicator pin {pin}"))?,
        ) as Box<dyn Signal + Send>),
        (true, None) => eyre::bail!("indicator enabled but pins.indicator is missing"),
        _ => None,
    };
    let infrared = if cfg.infrared.enabled {
        Some(Box::new(
            GpioInfrared::new(p.ir_left, p.ir_center, p.ir_right)
                .wrap_err("open infrared line sensors")?,
        ) as Box<dyn AuxSensor + Send>)
    } else {
        None
    };

    Ok(Backend {
        kind: BackendKind::Hardware,
        sensor: Box::new(sensor),
        drive: Box::new(drive),
        buzzer,
        indicator,
        infrared,
    })
}

/// Pick simulated or hardware backends. Without the `hardware` feature the
/// simulation is always used.
pub fn build_backend(cfg: &Config, sim: bool) -> eyre::Result<Backend> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        if !sim {
            return hardware_backend(cfg);
        }
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        if !sim {
            tracing::debug!("built without hardware support, using simulation");
        }
    }
    Ok(simulated_backend(cfg))
}

fn backend_kind(sim: bool) -> BackendKind {
    if !sim && cfg!(all(feature = "hardware", target_os = "linux")) {
        BackendKind::Hardware
    } else {
        BackendKind::Simulated
    }
}

pub fn run_rover(cfg: &Config, duration_ms: Option<u64>, sim: bool, json: bool) -> eyre::Result<()> {
    let rover_cfg = RoverCfg::from(cfg);
    let backend = build_backend(cfg, sim)?;
    tracing::info!(
        backend = backend.kind.name(),
        threshold_cm = rover_cfg.sampler.hazard_threshold_cm,
        "starting rover"
    );

    let shutdown = ShutdownSignal::new();
    {
        let signal = shutdown.clone();
        ctrlc::set_handler(move || signal.trigger()).wrap_err("install Ctrl-C handler")?;
    }

    let mut builder = Supervisor::builder()
        .with_config(rover_cfg)
        .with_shutdown_signal(shutdown)
        .with_range_sensor(backend.sensor)
        .with_drive_train(backend.drive);
    if let Some(b) = backend.buzzer {
        builder = builder.with_buzzer(b);
    }
    if let Some(i) = backend.indicator {
        builder = builder.with_indicator(i);
    }
    if let Some(ir) = backend.infrared {
        builder = builder.with_infrared(ir);
    }

    let supervisor = builder.start()?;
    let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
    let report = supervisor.run(deadline)?;

    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "maneuvers": report.maneuvers,
                "disarmed": report.disarmed,
                "stragglers": report.stragglers,
            })
        );
    } else {
        println!("shutdown complete: maneuvers={}", report.maneuvers);
        if !report.stragglers.is_empty() {
            println!("workers still running: {}", report.stragglers.join(", "));
        }
    }
    Ok(())
}

/// Open every capability, take `samples` readings, then disarm and close.
pub fn self_check(cfg: &Config, samples: u32, sim: bool, json: bool) -> eyre::Result<()> {
    let rover_cfg = RoverCfg::from(cfg);
    let mut backend = build_backend(cfg, sim)?;
    let range = rover_cfg.sampler.valid_range;

    let mut valid = 0u32;
    let mut faults = 0u32;
    let mut last = None;
    for _ in 0..samples {
        match backend.sensor.sample(rover_cfg.sampler.sensor_timeout) {
            Ok(reading) => {
                if let Some(s) = range.admit(reading) {
                    valid += 1;
                    last = Some(s.cm());
                }
            }
            Err(e) => {
                faults += 1;
                tracing::warn!(error = %map_sensor_error(&*e), "self-check sample failed");
            }
        }
        std::thread::sleep(rover_cfg.sampler.period);
    }

    if let Some(b) = backend.buzzer.as_mut() {
        b.set(false).map_err(|e| eyre::eyre!("buzzer: {e}"))?;
    }
    backend
        .drive
        .disarm()
        .map_err(|e| eyre::eyre!("disarm drive train: {e}"))?;
    let _ = backend.drive.close();
    let _ = backend.sensor.close();

    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "backend": backend.kind.name(),
                "samples": samples,
                "valid": valid,
                "faults": faults,
                "last_cm": last,
            })
        );
    } else {
        println!(
            "self-check ok: backend={} valid={valid}/{samples} faults={faults}",
            backend.kind.name()
        );
    }
    Ok(())
}

pub fn health(cfg: &Config, config_path: &std::path::Path) -> eyre::Result<()> {
    let rover_cfg = RoverCfg::from(cfg);
    println!(
        "{}",
        json!({
            "status": "ok",
            "config": config_path.display().to_string(),
            "backend": backend_kind(false).name(),
            "hazard_threshold_cm": rover_cfg.sampler.hazard_threshold_cm,
            "shutdown_latency_ms": cfg.shutdown_latency_ms(),
            "join_timeout_ms": cfg.supervisor.join_timeout_ms,
        })
    );
    Ok(())
}
