//! Raspberry Pi backends: HC-SR04 ranger, PCA9685 four-wheel drive, GPIO
//! buzzer/LED and the three-channel infrared tracker.

use std::thread::sleep;
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use rover_traits::{AuxSensor, BoxError, DriveTrain, MotionCommand, RangeSensor, Signal};
use tracing::{debug, trace};

use crate::drive::{DutyProfile, WHEELS, WheelOutput, bridge_levels, wheel_outputs};
use crate::error::{HwError, Result};
use crate::ranging::{TRIGGER_PULSE, echo_to_cm};
use crate::util::wait_while_with_timeout;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn i2c_err(e: rppal::i2c::Error) -> HwError {
    HwError::I2c(e.to_string())
}

fn output_pin(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_output_low())
}

fn input_pin(gpio: &Gpio, pin: u8) -> Result<InputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_input())
}

pub struct HcSr04 {
    trig: OutputPin,
    echo: InputPin,
}

impl HcSr04 {
    pub fn new(trig_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            trig: output_pin(&gpio, trig_pin)?,
            echo: input_pin(&gpio, echo_pin)?,
        })
    }

    /// One ranging cycle. `Ok(None)` when the echo never starts or never ends
    /// within `timeout` (each edge gets the full budget).
    pub fn measure(&mut self, timeout: Duration) -> Result<Option<f64>> {
        self.trig.set_low();
        sleep(Duration::from_micros(2));
        self.trig.set_high();
        sleep(TRIGGER_PULSE);
        self.trig.set_low();

        let echo = &self.echo;
        let start = match wait_while_with_timeout(|| echo.is_low(), timeout, Duration::ZERO) {
            Ok(t) => t,
            Err(HwError::LevelTimeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        let end = match wait_while_with_timeout(|| echo.is_high(), timeout, Duration::ZERO) {
            Ok(t) => t,
            Err(HwError::LevelTimeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        let cm = echo_to_cm(end.saturating_duration_since(start));
        trace!(distance_cm = cm, "hc-sr04 echo");
        Ok(Some(cm))
    }
}

impl RangeSensor for HcSr04 {
    fn sample(&mut self, timeout: Duration) -> std::result::Result<Option<f64>, BoxError> {
        Ok(self.measure(timeout)?)
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        self.trig.set_low();
        Ok(())
    }
}

const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;
const OSC_HZ: f64 = 25_000_000.0;

/// Minimal PCA9685 16-channel PWM driver.
pub struct Pca9685 {
    i2c: I2c,
}

impl Pca9685 {
    pub fn new(address: u16) -> Result<Self> {
        let mut i2c = I2c::new().map_err(i2c_err)?;
        i2c.set_slave_address(address).map_err(i2c_err)?;
        i2c.smbus_write_byte(MODE1, 0x00).map_err(i2c_err)?;
        Ok(Self { i2c })
    }

    pub fn set_pwm_freq(&mut self, hz: u16) -> Result<()> {
        let prescale = (OSC_HZ / 4096.0 / f64::from(hz.max(1))).round() - 1.0;
        let prescale = prescale.clamp(3.0, 255.0) as u8;
        let old = self.i2c.smbus_read_byte(MODE1).map_err(i2c_err)?;
        // Prescale can only be written while the oscillator sleeps.
        self.write(MODE1, (old & 0x7F) | 0x10)?;
        self.write(PRESCALE, prescale)?;
        self.write(MODE1, old)?;
        sleep(Duration::from_millis(5));
        self.write(MODE1, old | 0x80)
    }

    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        let base = LED0_ON_L + 4 * channel;
        self.write(base, (on & 0xFF) as u8)?;
        self.write(base + 1, (on >> 8) as u8)?;
        self.write(base + 2, (off & 0xFF) as u8)?;
        self.write(base + 3, (off >> 8) as u8)
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<()> {
        self.i2c.smbus_write_byte(reg, value).map_err(i2c_err)
    }
}

/// Four wheels on a PCA9685, one H-bridge channel pair per wheel.
pub struct FourWheelDrive {
    pwm: Pca9685,
    profile: DutyProfile,
}

impl FourWheelDrive {
    pub fn new(address: u16, pwm_freq_hz: u16, profile: DutyProfile) -> Result<Self> {
        let mut pwm = Pca9685::new(address)?;
        pwm.set_pwm_freq(pwm_freq_hz)?;
        let mut me = Self { pwm, profile };
        me.apply([WheelOutput::Coast; 4])?;
        Ok(me)
    }

    fn apply(&mut self, outputs: [WheelOutput; 4]) -> Result<()> {
        for (wheel, out) in WHEELS.iter().zip(outputs) {
            let (fwd_ch, rev_ch) = wheel.channels();
            let (fwd, rev) = bridge_levels(out);
            self.pwm.set_pwm(fwd_ch, 0, fwd)?;
            self.pwm.set_pwm(rev_ch, 0, rev)?;
        }
        Ok(())
    }
}

impl DriveTrain for FourWheelDrive {
    fn drive(&mut self, cmd: MotionCommand) -> std::result::Result<(), BoxError> {
        debug!(%cmd, "drive");
        Ok(self.apply(wheel_outputs(cmd, &self.profile))?)
    }

    fn disarm(&mut self) -> std::result::Result<(), BoxError> {
        Ok(self.apply([WheelOutput::Coast; 4])?)
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        self.disarm()
    }
}

/// Active-high GPIO output used as buzzer or indicator LED.
pub struct GpioSignal {
    pin: OutputPin,
}

impl GpioSignal {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            pin: output_pin(&gpio, pin)?,
        })
    }
}

impl Signal for GpioSignal {
    fn set(&mut self, on: bool) -> std::result::Result<(), BoxError> {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

/// Three reflective IR sensors packed as left<<2 | center<<1 | right.
pub struct GpioInfrared {
    left: InputPin,
    center: InputPin,
    right: InputPin,
}

impl GpioInfrared {
    pub fn new(left: u8, center: u8, right: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            left: input_pin(&gpio, left)?,
            center: input_pin(&gpio, center)?,
            right: input_pin(&gpio, right)?,
        })
    }
}

impl AuxSensor for GpioInfrared {
    fn read(&mut self) -> std::result::Result<u8, BoxError> {
        let bit = |p: &InputPin| u8::from(p.is_high());
        Ok((bit(&self.left) << 2) | (bit(&self.center) << 1) | bit(&self.right))
    }
}
