//! Mapping from symbolic motion commands to per-wheel outputs.
//!
//! Wheels are ordered front-left, rear-left, front-right, rear-right. Each
//! wheel sits on an H-bridge driven by two PWM channels.

use rover_traits::MotionCommand;

/// PCA9685 full-scale count.
pub const FULL_SCALE: u16 = 4095;

/// Duty magnitudes used for each kind of motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyProfile {
    pub advance: u16,
    pub reverse: u16,
    pub turn: u16,
}

impl Default for DutyProfile {
    fn default() -> Self {
        Self {
            advance: 1000,
            reverse: 1000,
            turn: 1000,
        }
    }
}

/// What a single wheel's bridge should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelOutput {
    /// Signed duty; positive turns the wheel forward.
    Drive(i32),
    /// Both bridge inputs high: short the motor for an active brake.
    Brake,
    /// Both bridge inputs low: no drive, wheel free.
    Coast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    FrontLeft,
    RearLeft,
    FrontRight,
    RearRight,
}

pub const WHEELS: [Wheel; 4] = [
    Wheel::FrontLeft,
    Wheel::RearLeft,
    Wheel::FrontRight,
    Wheel::RearRight,
];

impl Wheel {
    /// PWM channel pair (forward input, reverse input) on the driver board.
    pub fn channels(self) -> (u8, u8) {
        match self {
            Wheel::FrontLeft => (0, 1),
            Wheel::RearLeft => (3, 2),
            Wheel::FrontRight => (6, 7),
            Wheel::RearRight => (4, 5),
        }
    }
}

/// Per-wheel outputs for `cmd`.
pub fn wheel_outputs(cmd: MotionCommand, p: &DutyProfile) -> [WheelOutput; 4] {
    let all = |d: i32| [WheelOutput::Drive(d); 4];
    match cmd {
        MotionCommand::Advance => all(i32::from(p.advance)),
        MotionCommand::Reverse => all(-i32::from(p.reverse)),
        MotionCommand::RotateLeft => {
            let t = i32::from(p.turn);
            [
                WheelOutput::Drive(-t),
                WheelOutput::Drive(-t),
                WheelOutput::Drive(t),
                WheelOutput::Drive(t),
            ]
        }
        MotionCommand::RotateRight => {
            let t = i32::from(p.turn);
            [
                WheelOutput::Drive(t),
                WheelOutput::Drive(t),
                WheelOutput::Drive(-t),
                WheelOutput::Drive(-t),
            ]
        }
        // Stop holds the wheels like the stock firmware does for a zero duty.
        MotionCommand::Brake | MotionCommand::Stop => [WheelOutput::Brake; 4],
    }
}

/// Signed duties for `cmd`, with brake/coast reported as 0.
pub fn wheel_duties(cmd: MotionCommand, p: &DutyProfile) -> [i32; 4] {
    wheel_outputs(cmd, p).map(|w| match w {
        WheelOutput::Drive(d) => d,
        WheelOutput::Brake | WheelOutput::Coast => 0,
    })
}

/// Channel levels (forward input, reverse input) for one wheel.
pub fn bridge_levels(out: WheelOutput) -> (u16, u16) {
    match out {
        WheelOutput::Drive(d) => {
            let mag = u16::try_from(d.unsigned_abs())
                .unwrap_or(FULL_SCALE)
                .min(FULL_SCALE);
            if d >= 0 { (mag, 0) } else { (0, mag) }
        }
        WheelOutput::Brake => (FULL_SCALE, FULL_SCALE),
        WheelOutput::Coast => (0, 0),
    }
}
