//! Latest-value store shared by the sampler, controller and supervisor.
//!
//! Every accessor takes the lock for a copy in or out and nothing else, so
//! no thread ever blocks or sleeps while holding it.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::sample::DistanceSample;
use crate::status::ControllerState;

/// Point-in-time copy of everything in [`SharedState`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateSnapshot {
    pub distance: DistanceSample,
    /// Infrared tracker bits, left<<2 | center<<1 | right.
    pub infrared: u8,
    pub controller: ControllerState,
    pub accepted: u64,
    pub rejected: u64,
    pub maneuvers: u64,
    /// Instant of the last accepted sample.
    pub updated_at: Option<Instant>,
}

/// Handle to the shared record; clones point at the same storage.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<StateSnapshot>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent valid distance, or the sentinel before the first one.
    pub fn read(&self) -> DistanceSample {
        self.inner.lock().distance
    }

    pub fn write(&self, sample: DistanceSample, at: Instant) {
        let mut g = self.inner.lock();
        g.distance = sample;
        g.accepted += 1;
        g.updated_at = Some(at);
    }

    pub fn record_rejected(&self) {
        self.inner.lock().rejected += 1;
    }

    pub fn set_infrared(&self, bits: u8) {
        self.inner.lock().infrared = bits;
    }

    pub fn set_controller_state(&self, state: ControllerState) {
        self.inner.lock().controller = state;
    }

    pub fn record_maneuver(&self) {
        self.inner.lock().maneuvers += 1;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        *self.inner.lock()
    }
}
