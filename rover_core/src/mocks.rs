//! Test and helper mocks for rover_core.
//!
//! Each recording mock hands back a log handle that stays readable after the
//! mock itself was boxed and moved into the supervisor.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rover_traits::{BoxError, DriveTrain, MotionCommand, RangeSensor, Signal};

/// A range sensor that never sees an echo.
pub struct NoopRangeSensor;

impl RangeSensor for NoopRangeSensor {
    fn sample(&mut self, _timeout: Duration) -> Result<Option<f64>, BoxError> {
        Ok(None)
    }
}

/// Plays back a fixed script, then repeats `fallback` forever.
pub struct ScriptedRangeSensor {
    script: VecDeque<Result<Option<f64>, &'static str>>,
    fallback: Option<f64>,
}

impl ScriptedRangeSensor {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<Option<f64>, &'static str>>,
    {
        Self {
            script: script.into_iter().collect(),
            fallback: None,
        }
    }

    /// Script of plain readings.
    pub fn readings<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self::new(values.into_iter().map(|v| Ok(Some(v))))
    }

    pub fn then(mut self, fallback: f64) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl RangeSensor for ScriptedRangeSensor {
    fn sample(&mut self, _timeout: Duration) -> Result<Option<f64>, BoxError> {
        match self.script.pop_front() {
            Some(Ok(v)) => Ok(v),
            Some(Err(msg)) => Err(msg.into()),
            None => Ok(self.fallback),
        }
    }
}

type CommandHook = Box<dyn FnMut(MotionCommand) + Send>;

#[derive(Debug, Default)]
struct DriveLogInner {
    commands: Vec<MotionCommand>,
    disarms: usize,
    closed: bool,
}

/// Shared view of everything a [`RecordingDriveTrain`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct DriveLog(Arc<Mutex<DriveLogInner>>);

impl DriveLog {
    pub fn commands(&self) -> Vec<MotionCommand> {
        self.0.lock().commands.clone()
    }

    pub fn last_command(&self) -> Option<MotionCommand> {
        self.0.lock().commands.last().copied()
    }

    pub fn disarm_count(&self) -> usize {
        self.0.lock().disarms
    }

    pub fn closed(&self) -> bool {
        self.0.lock().closed
    }
}

/// Drive train that records commands, can fail on a given command and can
/// run a hook on each command (e.g. to trigger shutdown mid-maneuver).
pub struct RecordingDriveTrain {
    log: DriveLog,
    fail_on: Option<MotionCommand>,
    hook: Option<CommandHook>,
}

impl RecordingDriveTrain {
    pub fn new() -> (Self, DriveLog) {
        let log = DriveLog::default();
        (
            Self {
                log: log.clone(),
                fail_on: None,
                hook: None,
            },
            log,
        )
    }

    pub fn failing_on(mut self, cmd: MotionCommand) -> Self {
        self.fail_on = Some(cmd);
        self
    }

    pub fn on_command<F: FnMut(MotionCommand) + Send + 'static>(mut self, f: F) -> Self {
        self.hook = Some(Box::new(f));
        self
    }
}

impl DriveTrain for RecordingDriveTrain {
    fn drive(&mut self, cmd: MotionCommand) -> Result<(), BoxError> {
        if self.fail_on == Some(cmd) {
            return Err(format!("drive train rejected {cmd}").into());
        }
        self.log.0.lock().commands.push(cmd);
        if let Some(hook) = self.hook.as_mut() {
            hook(cmd);
        }
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), BoxError> {
        self.log.0.lock().disarms += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.log.0.lock().closed = true;
        Ok(())
    }
}

/// History of levels written to a [`RecordingSignal`].
#[derive(Debug, Clone, Default)]
pub struct SignalLog(Arc<Mutex<Vec<bool>>>);

impl SignalLog {
    pub fn levels(&self) -> Vec<bool> {
        self.0.lock().clone()
    }

    pub fn last(&self) -> Option<bool> {
        self.0.lock().last().copied()
    }

    /// Number of times the signal was switched on.
    pub fn pulses(&self) -> usize {
        self.0.lock().iter().filter(|&&on| on).count()
    }
}

pub struct RecordingSignal(SignalLog);

impl RecordingSignal {
    pub fn new() -> (Self, SignalLog) {
        let log = SignalLog::default();
        (Self(log.clone()), log)
    }
}

impl Signal for RecordingSignal {
    fn set(&mut self, on: bool) -> Result<(), BoxError> {
        self.0.0.lock().push(on);
        Ok(())
    }
}
