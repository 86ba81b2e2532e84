//! Wires the workers together, waits, and tears everything down.
//!
//! Teardown order is fixed: signal shutdown, join workers against one
//! deadline, disarm, then release the range sensor and the actuators. Steps
//! after the join run even when a worker did not stop in time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use rover_traits::{AuxSensor, Clock, DriveTrain, MonotonicClock, RangeSensor, Signal};

use crate::actuator::Actuator;
use crate::auxiliary::{run_indicator, run_infrared};
use crate::config::RoverCfg;
use crate::controller::Controller;
use crate::error::{BuildError, Report, Result, RoverError};
use crate::hazard::HazardQueue;
use crate::sampler::{RangeSampler, SensorHandle};
use crate::shared_state::SharedState;
use crate::shutdown::ShutdownSignal;
use crate::util::{as_ms, earliest};
use crate::worker::Worker;

/// Upper bound on waiting for a capability lock during teardown.
const CAPABILITY_LOCK_WAIT: Duration = Duration::from_millis(500);

/// Why `wait` returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownCause {
    /// The shutdown signal was set from outside (Ctrl-C, caller).
    Interrupt,
    /// The run deadline passed.
    Deadline,
    /// A worker reported a fatal fault.
    Fault(RoverError),
}

/// What teardown achieved.
#[derive(Debug, Clone, PartialEq)]
pub struct TeardownReport {
    pub disarmed: bool,
    /// Workers that missed the join deadline.
    pub stragglers: Vec<&'static str>,
    /// First fatal fault seen during the run or the teardown.
    pub fault: Option<RoverError>,
    pub maneuvers: u64,
}

#[derive(Default)]
pub struct SupervisorBuilder {
    cfg: RoverCfg,
    sensor: Option<Box<dyn RangeSensor + Send>>,
    drive: Option<Box<dyn DriveTrain + Send>>,
    buzzer: Option<Box<dyn Signal + Send>>,
    indicator: Option<Box<dyn Signal + Send>>,
    infrared: Option<Box<dyn AuxSensor + Send>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    shutdown: Option<ShutdownSignal>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, cfg: RoverCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_range_sensor(mut self, sensor: impl RangeSensor + Send + 'static) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }

    pub fn with_drive_train(mut self, drive: impl DriveTrain + Send + 'static) -> Self {
        self.drive = Some(Box::new(drive));
        self
    }

    pub fn with_buzzer(mut self, buzzer: impl Signal + Send + 'static) -> Self {
        self.buzzer = Some(Box::new(buzzer));
        self
    }

    pub fn with_indicator(mut self, led: impl Signal + Send + 'static) -> Self {
        self.indicator = Some(Box::new(led));
        self
    }

    pub fn with_infrared(mut self, sensor: impl AuxSensor + Send + 'static) -> Self {
        self.infrared = Some(Box::new(sensor));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing shutdown signal, e.g. one wired to Ctrl-C.
    pub fn with_shutdown_signal(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Validate, take ownership of the capabilities and start every worker.
    pub fn start(self) -> Result<Supervisor> {
        self.cfg.validate().map_err(Report::new)?;
        let sensor = self
            .sensor
            .ok_or_else(|| Report::new(BuildError::MissingRangeSensor))?;
        let drive = self
            .drive
            .ok_or_else(|| Report::new(BuildError::MissingDriveTrain))?;

        let cfg = self.cfg;
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let shutdown = self.shutdown.unwrap_or_default();
        let (faults_tx, faults_rx) = xch::unbounded();

        let mut sup = Supervisor {
            shared: SharedState::new(),
            queue: HazardQueue::new(cfg.sampler.queue_capacity),
            actuator: Actuator::new(drive, self.buzzer),
            sensor: SensorHandle::new(sensor),
            shutdown,
            faults_tx,
            faults_rx,
            workers: Vec::new(),
            fault: None,
            report: None,
            cfg,
        };

        // Any early return from here on drops `sup`, which tears down
        // whatever was already started.
        sup.spawn_sampler(Arc::clone(&clock))?;
        sup.spawn_controller(Arc::clone(&clock))?;
        if let Some(ir) = self.infrared {
            sup.spawn_infrared(ir, Arc::clone(&clock))?;
        }
        if let Some(led) = self.indicator {
            sup.spawn_indicator(led, clock)?;
        }
        tracing::info!(
            workers = sup.workers.len(),
            threshold_cm = sup.cfg.sampler.hazard_threshold_cm,
            "supervisor started"
        );
        Ok(sup)
    }
}

pub struct Supervisor {
    cfg: RoverCfg,
    shared: SharedState,
    queue: HazardQueue,
    actuator: Actuator,
    sensor: SensorHandle,
    shutdown: ShutdownSignal,
    faults_tx: xch::Sender<RoverError>,
    faults_rx: xch::Receiver<RoverError>,
    workers: Vec<Worker>,
    fault: Option<RoverError>,
    report: Option<TeardownReport>,
}

impl Supervisor {
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    fn spawn_sampler(&mut self, clock: Arc<dyn Clock + Send + Sync>) -> Result<()> {
        let sampler = RangeSampler::new(
            self.cfg.sampler.clone(),
            self.shared.clone(),
            self.queue.clone(),
        );
        let sensor = self.sensor.clone();
        let shutdown = self.shutdown.clone();
        let w = Worker::spawn("rover-sampler", self.faults_tx.clone(), move || {
            sampler.run(&sensor, &*clock, &shutdown)
        })
        .map_err(Report::new)?;
        self.workers.push(w);
        Ok(())
    }

    fn spawn_controller(&mut self, clock: Arc<dyn Clock + Send + Sync>) -> Result<()> {
        let mut controller = Controller::new(
            self.cfg.control.clone(),
            self.actuator.clone(),
            self.queue.clone(),
            self.shared.clone(),
            clock,
            self.shutdown.clone(),
        );
        let w = Worker::spawn("rover-controller", self.faults_tx.clone(), move || {
            controller.run().map(|_| ())
        })
        .map_err(Report::new)?;
        self.workers.push(w);
        Ok(())
    }

    fn spawn_infrared(
        &mut self,
        sensor: Box<dyn AuxSensor + Send>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<()> {
        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let period = self.cfg.supervisor.infrared_period;
        let tick = self.cfg.control.poll;
        let w = Worker::spawn("rover-infrared", self.faults_tx.clone(), move || {
            run_infrared(sensor, &shared, &*clock, &shutdown, period, tick)
        })
        .map_err(Report::new)?;
        self.workers.push(w);
        Ok(())
    }

    fn spawn_indicator(
        &mut self,
        led: Box<dyn Signal + Send>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<()> {
        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let period = self.cfg.supervisor.indicator_period;
        let tick = self.cfg.control.poll;
        let w = Worker::spawn("rover-indicator", self.faults_tx.clone(), move || {
            run_indicator(led, &shared, &*clock, &shutdown, period, tick)
        })
        .map_err(Report::new)?;
        self.workers.push(w);
        Ok(())
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn shared_state(&self) -> SharedState {
        self.shared.clone()
    }

    pub fn hazard_queue(&self) -> HazardQueue {
        self.queue.clone()
    }

    pub fn worker_names(&self) -> Vec<&'static str> {
        self.workers.iter().map(Worker::name).collect()
    }

    /// Block until interrupt, a fatal worker fault or `deadline`, logging a
    /// status line every status period.
    pub fn wait(&mut self, deadline: Option<Instant>) -> ShutdownCause {
        let status_period = self.cfg.supervisor.status_period;
        // Wake at least this often to notice an external interrupt.
        let tick = self.cfg.control.poll;
        let mut next_status = Instant::now() + status_period;
        loop {
            if self.shutdown.is_triggered() {
                tracing::info!("shutdown requested");
                return ShutdownCause::Interrupt;
            }
            let now = Instant::now();
            if let Some(d) = deadline
                && now >= d
            {
                tracing::info!("run deadline reached");
                return ShutdownCause::Deadline;
            }

            let wake = earliest(earliest(next_status, deadline), Some(now + tick));
            match self.faults_rx.recv_deadline(wake) {
                Ok(err) if err.is_fatal() => {
                    tracing::error!(error = %err, "fatal fault, shutting down");
                    if self.fault.is_none() {
                        self.fault = Some(err.clone());
                    }
                    return ShutdownCause::Fault(err);
                }
                Ok(err) => tracing::warn!(error = %err, "recoverable fault reported"),
                Err(_) => {}
            }

            if Instant::now() >= next_status {
                self.log_status();
                next_status += status_period;
            }
        }
    }

    fn log_status(&self) {
        let s = self.shared.snapshot();
        let age_ms = s.updated_at.map(|at| as_ms(at.elapsed()));
        tracing::info!(
            distance_cm = s.distance.cm(),
            infrared = s.infrared,
            state = %s.controller,
            accepted = s.accepted,
            rejected = s.rejected,
            maneuvers = s.maneuvers,
            pending = self.queue.len(),
            ?age_ms,
            "status"
        );
    }

    /// Stop everything. Safe to call more than once; later calls return the
    /// first report.
    pub fn teardown(&mut self) -> TeardownReport {
        if let Some(r) = &self.report {
            return r.clone();
        }
        self.shutdown.trigger();

        let deadline = Instant::now() + self.cfg.supervisor.join_timeout;
        let stragglers: Vec<&'static str> = self
            .workers
            .iter_mut()
            .filter_map(|w| (!w.join_within(deadline)).then(|| w.name()))
            .collect();

        // Faults reported while the workers were winding down.
        for err in self.faults_rx.try_iter() {
            if err.is_fatal() && self.fault.is_none() {
                self.fault = Some(err);
            }
        }

        let disarmed = match self.actuator.try_disarm_within(CAPABILITY_LOCK_WAIT) {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!("actuator lock not available, disarm skipped");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "disarm failed");
                if self.fault.is_none() {
                    self.fault = Some(
                        e.downcast_ref::<RoverError>()
                            .cloned()
                            .unwrap_or_else(|| RoverError::ActuatorFault(e.to_string())),
                    );
                }
                false
            }
        };

        if !self.sensor.try_release_within(CAPABILITY_LOCK_WAIT) {
            tracing::warn!("range sensor busy, release skipped");
        }
        if !self.actuator.try_release_within(CAPABILITY_LOCK_WAIT) {
            tracing::warn!("actuator busy, release skipped");
        }

        let report = TeardownReport {
            disarmed,
            stragglers,
            fault: self.fault.clone(),
            maneuvers: self.shared.snapshot().maneuvers,
        };
        tracing::info!(
            disarmed,
            maneuvers = report.maneuvers,
            stragglers = report.stragglers.len(),
            "shutdown complete"
        );
        self.report = Some(report.clone());
        report
    }

    /// `wait` then `teardown`. A fatal fault is returned as an error after
    /// the teardown has run.
    pub fn run(mut self, deadline: Option<Instant>) -> Result<TeardownReport> {
        let cause = self.wait(deadline);
        tracing::debug!(?cause, "supervisor leaving wait");
        let report = self.teardown();
        match &report.fault {
            Some(f) => Err(Report::new(f.clone())),
            None => Ok(report),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.report.is_none() {
            tracing::debug!("supervisor dropped without teardown");
            let _ = self.teardown();
        }
    }
}
