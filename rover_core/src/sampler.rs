//! Range sampling: validate each reading, publish it, raise hazards.
//!
//! The sampler thread is the only caller of the range sensor. Each cycle
//! either updates `SharedState` with a validated sample or leaves it alone;
//! a valid sample under the hazard threshold is also offered to the
//! `HazardQueue`. A full queue drops the event.
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rover_traits::{BoxError, Clock, RangeSensor};

use crate::config::SamplerCfg;
use crate::error::Result;
use crate::hazard::{HazardEvent, HazardQueue};
use crate::hw_error::map_sensor_error;
use crate::sample::DistanceSample;
use crate::shared_state::SharedState;
use crate::shutdown::ShutdownSignal;

/// Shared slot for the range sensor. The sampler borrows it per cycle;
/// the supervisor releases it during teardown.
#[derive(Clone)]
pub struct SensorHandle {
    inner: Arc<Mutex<Option<Box<dyn RangeSensor + Send>>>>,
}

impl SensorHandle {
    pub fn new(sensor: Box<dyn RangeSensor + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(sensor))),
        }
    }

    /// One ranging cycle; `None` once the sensor has been released.
    pub fn sample(&self, timeout: Duration) -> Option<std::result::Result<Option<f64>, BoxError>> {
        self.inner.lock().as_mut().map(|s| s.sample(timeout))
    }

    /// Close the sensor if the lock frees up within `timeout`.
    pub fn try_release_within(&self, timeout: Duration) -> bool {
        let Some(mut g) = self.inner.try_lock_for(timeout) else {
            return false;
        };
        if let Some(mut sensor) = g.take() {
            match sensor.close() {
                Ok(()) => tracing::debug!("range sensor released"),
                Err(e) => tracing::warn!(error = %e, "range sensor close failed"),
            }
        }
        true
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl std::fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorHandle").finish_non_exhaustive()
    }
}

/// What one reading did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Missing, non-finite or out of range; nothing was touched.
    Rejected,
    /// Stored in `SharedState`, no hazard.
    Stored(DistanceSample),
    /// Stored and below the threshold; `queued` is false when the queue was full.
    Hazard { sample: DistanceSample, queued: bool },
}

pub struct RangeSampler {
    cfg: SamplerCfg,
    state: SharedState,
    queue: HazardQueue,
}

impl RangeSampler {
    pub fn new(cfg: SamplerCfg, state: SharedState, queue: HazardQueue) -> Self {
        Self { cfg, state, queue }
    }

    /// Decide what one raw reading does to shared state and the hazard queue.
    pub fn ingest(&self, reading: Option<f64>, now: Instant) -> SampleOutcome {
        let Some(sample) = self.cfg.valid_range.admit(reading) else {
            self.state.record_rejected();
            tracing::trace!(?reading, "reading discarded");
            return SampleOutcome::Rejected;
        };
        self.state.write(sample, now);
        if sample.cm() >= self.cfg.hazard_threshold_cm {
            return SampleOutcome::Stored(sample);
        }
        let queued = self.queue.try_push(HazardEvent::obstacle(sample, now));
        if queued {
            tracing::debug!(distance_cm = sample.cm(), "hazard queued");
        } else {
            tracing::trace!(distance_cm = sample.cm(), "hazard queue full, event dropped");
        }
        SampleOutcome::Hazard { sample, queued }
    }

    /// Sample until shutdown or until the sensor is released. Sensor errors
    /// are logged and followed by a backoff; they never end the loop.
    pub fn run(&self, sensor: &SensorHandle, clock: &dyn Clock, shutdown: &ShutdownSignal) -> Result<()> {
        tracing::debug!(period_ms = crate::util::as_ms(self.cfg.period), "sampler started");
        loop {
            if shutdown.is_triggered() {
                tracing::debug!("sampler received shutdown signal");
                break;
            }

            let Some(result) = sensor.sample(self.cfg.sensor_timeout) else {
                tracing::debug!("range sensor released, sampler exiting");
                break;
            };
            let pause = match result {
                Ok(reading) => {
                    self.ingest(reading, clock.now());
                    self.cfg.period
                }
                Err(e) => {
                    let err = map_sensor_error(&*e);
                    tracing::warn!(error = %err, "range sensor error");
                    self.cfg.error_backoff
                }
            };

            // Check shutdown before sleep to avoid unnecessary delay
            if shutdown.is_triggered() {
                break;
            }
            clock.sleep(pause);
        }
        tracing::trace!("sampler thread exiting cleanly");
        Ok(())
    }
}
