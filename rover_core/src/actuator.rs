//! Motion and alert output shared by the controller and the supervisor.
//!
//! The controller is the only thread that issues motion commands. The
//! supervisor only reaches in after the workers were told to stop, and then
//! with a bounded lock wait, so a hung capability cannot hang teardown.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rover_traits::{Clock, DriveTrain, MotionCommand, Signal};

use crate::error::{Report, Result};
use crate::hw_error::map_actuator_error;

struct Devices {
    drive: Option<Box<dyn DriveTrain + Send>>,
    buzzer: Option<Box<dyn Signal + Send>>,
    disarmed: bool,
    disarm_count: u64,
}

impl Devices {
    fn disarm(&mut self) -> Result<()> {
        if self.disarmed {
            return Ok(());
        }
        if let Some(buzzer) = self.buzzer.as_mut()
            && let Err(e) = buzzer.set(false)
        {
            tracing::warn!(error = %e, "buzzer off failed during disarm");
        }
        let Some(drive) = self.drive.as_mut() else {
            // Already released; nothing left to stop.
            self.disarmed = true;
            return Ok(());
        };
        drive
            .disarm()
            .map_err(|e| Report::new(map_actuator_error(&*e)))?;
        self.disarmed = true;
        self.disarm_count += 1;
        tracing::info!(count = self.disarm_count, "actuators disarmed");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut buzzer) = self.buzzer.take()
            && let Err(e) = buzzer.close()
        {
            tracing::warn!(error = %e, "buzzer close failed");
        }
        if let Some(mut drive) = self.drive.take() {
            match drive.close() {
                Ok(()) => tracing::debug!("drive train released"),
                Err(e) => tracing::warn!(error = %e, "drive train close failed"),
            }
        }
    }
}

impl Drop for Devices {
    fn drop(&mut self) {
        if self.drive.is_none() && self.buzzer.is_none() {
            return;
        }
        tracing::debug!("actuator dropped without release; disarming");
        if let Err(e) = self.disarm() {
            tracing::error!(error = %e, "disarm on drop failed");
        }
        self.release();
    }
}

/// Cloneable handle to the drive train and the optional buzzer.
#[derive(Clone)]
pub struct Actuator {
    inner: Arc<Mutex<Devices>>,
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator").finish_non_exhaustive()
    }
}

impl Actuator {
    pub fn new(drive: Box<dyn DriveTrain + Send>, buzzer: Option<Box<dyn Signal + Send>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Devices {
                drive: Some(drive),
                buzzer,
                disarmed: false,
                disarm_count: 0,
            })),
        }
    }

    /// Apply `cmd`, then hold it for `duration` on `clock`. The lock is
    /// released before sleeping.
    pub fn execute(
        &self,
        cmd: MotionCommand,
        duration: Option<Duration>,
        clock: &dyn Clock,
    ) -> Result<()> {
        {
            let mut g = self.inner.lock();
            let Some(drive) = g.drive.as_mut() else {
                return Err(Report::new(crate::error::RoverError::ActuatorFault(
                    "drive train already released".into(),
                )));
            };
            drive
                .drive(cmd)
                .map_err(|e| Report::new(map_actuator_error(&*e)))?;
            g.disarmed = false;
        }
        tracing::trace!(%cmd, ?duration, "motion");
        if let Some(d) = duration
            && !d.is_zero()
        {
            clock.sleep(d);
        }
        Ok(())
    }

    /// Switch the buzzer. Failures are logged, never fatal.
    pub fn signal(&self, on: bool) {
        let mut g = self.inner.lock();
        if let Some(buzzer) = g.buzzer.as_mut()
            && let Err(e) = buzzer.set(on)
        {
            tracing::warn!(error = %e, on, "buzzer failed");
        }
    }

    pub fn has_signal(&self) -> bool {
        self.inner.lock().buzzer.is_some()
    }

    /// Zero every wheel and silence the buzzer. Repeated calls are no-ops
    /// until the next `execute`.
    pub fn disarm(&self) -> Result<()> {
        self.inner.lock().disarm()
    }

    /// Like [`disarm`](Self::disarm) but gives up after `timeout` if the lock
    /// is held. `Ok(false)` means the lock was not obtained.
    pub fn try_disarm_within(&self, timeout: Duration) -> Result<bool> {
        match self.inner.try_lock_for(timeout) {
            Some(mut g) => g.disarm().map(|()| true),
            None => Ok(false),
        }
    }

    /// Close the capabilities. Later commands fail with an actuator fault.
    pub fn release(&self) {
        self.inner.lock().release();
    }

    pub fn try_release_within(&self, timeout: Duration) -> bool {
        match self.inner.try_lock_for(timeout) {
            Some(mut g) => {
                g.release();
                true
            }
            None => false,
        }
    }

    pub fn is_disarmed(&self) -> bool {
        self.inner.lock().disarmed
    }

    /// Number of effective disarms so far.
    pub fn disarm_count(&self) -> u64 {
        self.inner.lock().disarm_count
    }
}
