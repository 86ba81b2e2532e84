//! Device backends for the rover capabilities.
//!
//! Simulated backends are always available; the Raspberry Pi backends need
//! the `hardware` feature on Linux.
pub mod drive;
pub mod error;
pub mod ranging;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware;

pub use drive::{DutyProfile, wheel_duties};
pub use error::HwError;
pub use sim::{SimulatedDriveTrain, SimulatedInfrared, SimulatedRangeSensor, SimulatedSignal};
