//! Advance / evade state machine.
//!
//! One controller, parameterized by `ControlCfg`. While advancing it polls
//! the hazard queue; a hazard outside the cooldown window starts a fixed
//! evasion plan that hazards cannot interrupt. Shutdown is checked at every
//! poll and between plan steps, so a step in progress always finishes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rover_traits::{Clock, MotionCommand};

use crate::actuator::Actuator;
use crate::config::ControlCfg;
use crate::error::Result;
use crate::hazard::{HazardEvent, HazardQueue};
use crate::shared_state::SharedState;
use crate::shutdown::ShutdownSignal;
use crate::status::ControllerState;

/// One fixed-duration step of the evasion plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverStep {
    /// Issue `cmd` and hold it for `duration` (zero: issue only).
    Drive {
        cmd: MotionCommand,
        duration: Duration,
    },
    /// Switch the buzzer and hold for `duration`.
    Alert { on: bool, duration: Duration },
    Pause(Duration),
}

impl ManeuverStep {
    pub fn duration(self) -> Duration {
        match self {
            Self::Drive { duration, .. } | Self::Alert { duration, .. } | Self::Pause(duration) => {
                duration
            }
        }
    }
}

const fn stop() -> ManeuverStep {
    ManeuverStep::Drive {
        cmd: MotionCommand::Stop,
        duration: Duration::ZERO,
    }
}

/// Stop, optional reverse, alert pulses, turn, stop, optional settle.
pub fn evasion_plan(cfg: &ControlCfg) -> Vec<ManeuverStep> {
    let mut plan = vec![stop()];
    if !cfg.reverse.is_zero() {
        plan.push(ManeuverStep::Drive {
            cmd: MotionCommand::Reverse,
            duration: cfg.reverse,
        });
        plan.push(stop());
    }
    for _ in 0..cfg.alert.pulses {
        plan.push(ManeuverStep::Alert {
            on: true,
            duration: cfg.alert.on,
        });
        plan.push(ManeuverStep::Alert {
            on: false,
            duration: cfg.alert.off,
        });
    }
    plan.push(ManeuverStep::Drive {
        cmd: cfg.turn_direction.command(),
        duration: cfg.turn_duration,
    });
    plan.push(stop());
    if !cfg.settle.is_zero() {
        plan.push(ManeuverStep::Pause(cfg.settle));
    }
    plan
}

/// Longest single step; bounds how late shutdown can be noticed mid-maneuver.
pub fn max_step_duration(cfg: &ControlCfg) -> Duration {
    evasion_plan(cfg)
        .into_iter()
        .map(ManeuverStep::duration)
        .max()
        .unwrap_or_default()
}

/// Counters returned when the control loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerSummary {
    pub maneuvers: u64,
    pub suppressed: u64,
}

pub struct Controller {
    cfg: ControlCfg,
    plan: Vec<ManeuverStep>,
    actuator: Actuator,
    queue: HazardQueue,
    shared: SharedState,
    clock: Arc<dyn Clock + Send + Sync>,
    shutdown: ShutdownSignal,
    state: ControllerState,
    last_handled: Option<Instant>,
    maneuvers: u64,
    suppressed: u64,
}

impl Controller {
    pub fn new(
        cfg: ControlCfg,
        actuator: Actuator,
        queue: HazardQueue,
        shared: SharedState,
        clock: Arc<dyn Clock + Send + Sync>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let plan = evasion_plan(&cfg);
        Self {
            cfg,
            plan,
            actuator,
            queue,
            shared,
            clock,
            shutdown,
            state: ControllerState::Advancing,
            last_handled: None,
            maneuvers: 0,
            suppressed: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn maneuvers(&self) -> u64 {
        self.maneuvers
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn summary(&self) -> ControllerSummary {
        ControllerSummary {
            maneuvers: self.maneuvers,
            suppressed: self.suppressed,
        }
    }

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "controller state");
        }
        self.state = state;
        self.shared.set_controller_state(state);
    }

    /// Enter Advancing and start driving forward.
    pub fn begin(&mut self) -> Result<()> {
        self.set_state(ControllerState::Advancing);
        self.actuator
            .execute(MotionCommand::Advance, None, &*self.clock)?;
        tracing::info!(
            cooldown_ms = crate::util::as_ms(self.cfg.cooldown),
            turn = %self.cfg.turn_direction.command(),
            "controller started"
        );
        Ok(())
    }

    /// One poll iteration. Returns the state after the iteration.
    pub fn step(&mut self) -> Result<ControllerState> {
        if self.state == ControllerState::ShuttingDown {
            return Ok(self.state);
        }
        if self.shutdown.is_triggered() {
            self.enter_shutdown()?;
            return Ok(self.state);
        }

        if let Some(event) = self.queue.try_pop() {
            let now = self.clock.now();
            if self.in_cooldown(now) {
                self.suppressed += 1;
                tracing::debug!(distance_cm = event.distance_cm, "hazard inside cooldown dropped");
            } else {
                self.evade(event)?;
                return Ok(self.state);
            }
        }

        self.clock.sleep(self.cfg.poll);
        Ok(self.state)
    }

    /// `begin` then poll until shutdown.
    pub fn run(&mut self) -> Result<ControllerSummary> {
        self.begin()?;
        while self.step()? != ControllerState::ShuttingDown {}
        tracing::info!(
            maneuvers = self.maneuvers,
            suppressed = self.suppressed,
            "controller stopped"
        );
        Ok(self.summary())
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        self.last_handled
            .is_some_and(|at| now.saturating_duration_since(at) < self.cfg.cooldown)
    }

    fn evade(&mut self, event: HazardEvent) -> Result<()> {
        tracing::warn!(distance_cm = event.distance_cm, "obstacle ahead, evading");
        self.set_state(ControllerState::Evading);

        let plan = self.plan.clone();
        for step in plan {
            if self.shutdown.is_triggered() {
                return self.enter_shutdown();
            }
            self.run_step(step)?;
        }

        let dropped = self.queue.drain();
        self.last_handled = Some(self.clock.now());
        self.maneuvers += 1;
        self.shared.record_maneuver();
        tracing::info!(maneuvers = self.maneuvers, dropped, "evasion complete");

        if self.shutdown.is_triggered() {
            return self.enter_shutdown();
        }
        self.set_state(ControllerState::Advancing);
        self.actuator
            .execute(MotionCommand::Advance, None, &*self.clock)
    }

    fn run_step(&self, step: ManeuverStep) -> Result<()> {
        match step {
            ManeuverStep::Drive { cmd, duration } => {
                self.actuator.execute(cmd, Some(duration), &*self.clock)
            }
            ManeuverStep::Alert { on, duration } => {
                self.actuator.signal(on);
                self.clock.sleep(duration);
                Ok(())
            }
            ManeuverStep::Pause(d) => {
                self.clock.sleep(d);
                Ok(())
            }
        }
    }

    fn enter_shutdown(&mut self) -> Result<()> {
        if self.state == ControllerState::ShuttingDown {
            return Ok(());
        }
        self.set_state(ControllerState::ShuttingDown);
        self.actuator.signal(false);
        self.actuator
            .execute(MotionCommand::Stop, None, &*self.clock)?;
        tracing::info!("controller shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurnDirection;

    #[test]
    fn default_plan_shape() {
        let plan = evasion_plan(&ControlCfg::default());
        // stop, reverse, stop, 3x(on, off), turn, stop, settle
        assert_eq!(plan.len(), 1 + 2 + 6 + 2 + 1);
        assert_eq!(plan[0], stop());
        assert_eq!(
            plan[9],
            ManeuverStep::Drive {
                cmd: MotionCommand::RotateLeft,
                duration: Duration::from_secs(1)
            }
        );
        assert_eq!(plan.last(), Some(&ManeuverStep::Pause(Duration::from_millis(100))));
    }

    #[test]
    fn optional_steps_can_be_disabled() {
        let cfg = ControlCfg {
            reverse: Duration::ZERO,
            settle: Duration::ZERO,
            turn_direction: TurnDirection::Right,
            alert: crate::config::AlertCfg {
                pulses: 0,
                ..Default::default()
            },
            ..ControlCfg::default()
        };
        let plan = evasion_plan(&cfg);
        assert_eq!(
            plan,
            vec![
                stop(),
                ManeuverStep::Drive {
                    cmd: MotionCommand::RotateRight,
                    duration: Duration::from_secs(1)
                },
                stop()
            ]
        );
    }

    #[test]
    fn max_step_is_the_turn_by_default() {
        assert_eq!(
            max_step_duration(&ControlCfg::default()),
            Duration::from_secs(1)
        );
    }
}
