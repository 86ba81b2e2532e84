#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Obstacle-avoidance control loop (hardware-agnostic).
//!
//! All hardware interactions go through the `rover_traits` capabilities
//! (`RangeSensor`, `DriveTrain`, `Signal`, `AuxSensor`).
//!
//! ## Architecture
//!
//! - **Sampling**: `RangeSampler` validates readings into `SharedState` and
//!   raises `HazardEvent`s on a bounded `HazardQueue` (`sampler` module)
//! - **Control**: `Controller` runs the advance / evade state machine with a
//!   cooldown between evasions (`controller` module)
//! - **Actuation**: `Actuator` owns the drive train and buzzer, with an
//!   idempotent `disarm` (`actuator` module)
//! - **Supervision**: `Supervisor` starts the named worker threads, waits for
//!   interrupt, deadline or fault, and tears down in a fixed order
//!
//! Only the supervisor's `wait` uses wall-clock time. Everything else runs on
//! an injected `Clock`, so tests can drive whole maneuvers instantly.

pub mod actuator;
pub mod auxiliary;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hazard;
pub mod hw_error;
pub mod mocks;
pub mod sample;
pub mod sampler;
pub mod shared_state;
pub mod shutdown;
pub mod status;
pub mod supervisor;
pub mod util;
pub mod worker;

pub use actuator::Actuator;
pub use config::{AlertCfg, ControlCfg, RoverCfg, SamplerCfg, SupervisorCfg, TurnDirection};
pub use controller::{Controller, ControllerSummary, ManeuverStep, evasion_plan, max_step_duration};
pub use error::{BuildError, Report, Result, RoverError};
pub use hazard::{HazardEvent, HazardKind, HazardQueue};
pub use sample::{DistanceSample, SAFE_DISTANCE_CM, ValidRange};
pub use sampler::{RangeSampler, SampleOutcome, SensorHandle};
pub use shared_state::{SharedState, StateSnapshot};
pub use shutdown::ShutdownSignal;
pub use status::ControllerState;
pub use supervisor::{ShutdownCause, Supervisor, SupervisorBuilder, TeardownReport};
