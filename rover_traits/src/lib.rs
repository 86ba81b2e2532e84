//! Capability traits shared by the rover core and its hardware backends.
//!
//! The core never talks to pins or buses directly; it drives these traits.
//! Errors cross the boundary as `BoxError` and are mapped to typed errors by
//! `rover_core::hw_error`.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Symbolic motion command accepted by a drive train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionCommand {
    Advance,
    Reverse,
    RotateLeft,
    RotateRight,
    Brake,
    Stop,
}

impl MotionCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Reverse => "reverse",
            Self::RotateLeft => "rotate_left",
            Self::RotateRight => "rotate_right",
            Self::Brake => "brake",
            Self::Stop => "stop",
        }
    }
}

impl std::fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Forward-facing range sensor.
pub trait RangeSensor {
    /// Run one ranging cycle, waiting at most `timeout` for the echo.
    ///
    /// `Ok(None)` means no reading this cycle (no echo, timeout). `Err` is a
    /// capability fault; the caller decides whether to retry.
    fn sample(&mut self, timeout: std::time::Duration) -> Result<Option<f64>, BoxError>;

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Wheel drive. Holds the last commanded state until superseded.
pub trait DriveTrain {
    fn drive(&mut self, cmd: MotionCommand) -> Result<(), BoxError>;

    /// Put every wheel output at zero. Defaults to a Stop command.
    fn disarm(&mut self) -> Result<(), BoxError> {
        self.drive(MotionCommand::Stop)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// On/off signaling device (buzzer, indicator LED).
pub trait Signal {
    fn set(&mut self, on: bool) -> Result<(), BoxError>;

    fn close(&mut self) -> Result<(), BoxError> {
        self.set(false)
    }
}

/// Auxiliary digital sensor, e.g. the infrared line tracker.
pub trait AuxSensor {
    fn read(&mut self) -> Result<u8, BoxError>;

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn sample(&mut self, timeout: std::time::Duration) -> Result<Option<f64>, BoxError> {
        (**self).sample(timeout)
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: DriveTrain + ?Sized> DriveTrain for Box<T> {
    fn drive(&mut self, cmd: MotionCommand) -> Result<(), BoxError> {
        (**self).drive(cmd)
    }
    fn disarm(&mut self) -> Result<(), BoxError> {
        (**self).disarm()
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: Signal + ?Sized> Signal for Box<T> {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        (**self).set(on)
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: AuxSensor + ?Sized> AuxSensor for Box<T> {
    fn read(&mut self) -> Result<u8, BoxError> {
        (**self).read()
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}
