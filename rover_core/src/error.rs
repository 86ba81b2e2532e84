use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoverError {
    #[error("sensor fault: {0}")]
    Sensor(String),
    #[error("sensor timeout")]
    SensorTimeout,
    #[error("actuator fault: {0}")]
    ActuatorFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("worker {0} panicked")]
    WorkerPanic(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl RoverError {
    /// Faults that must stop the rover. Sensor trouble is recovered locally.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Sensor(_) | Self::SensorTimeout)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing range sensor")]
    MissingRangeSensor,
    #[error("missing drive train")]
    MissingDriveTrain,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("failed to spawn worker {0}")]
    Spawn(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
