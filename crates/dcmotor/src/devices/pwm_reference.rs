//! H-bridge wired with IN1/IN2 as digital outputs and Vref as the PWM line.
//!
//! Speed comes from the reference voltage; direction from the digital pair.
//!
//! | IN1 | IN2 | Vref | Motor state  |
//! |-----|-----|------|--------------|
//! | 0   | 0   | 0    | Free (coast) |
//! | 1   | 0   | PWM  | Forward      |
//! | 0   | 1   | PWM  | Backward     |
//! | 1   | 1   | 0    | Brake        |

use tracing::{debug, info};

use crate::error::MotorError;
use crate::hardware::gpio::{GpioController, Level, Pin, PinMode};
use crate::hardware::shared::{PinClaim, SharedGpio};
use crate::traits::driver::{Direction, DriveState, PinAssignment, PinDriver, duty_cycle};

/// Driver for the PWM-reference wiring. Needs a single PWM channel per motor.
pub struct PwmReferenceDriver<G: GpioController> {
    claim: PinClaim<G>,
    pins: PinAssignment,
    vref: Pin,
}

impl<G: GpioController> PwmReferenceDriver<G> {
    /// Claim IN1, IN2 and Vref, configure them, and leave the motor free.
    ///
    /// # Errors
    ///
    /// * `MotorError::InvalidConfig` if `pins.vref` is `None`, or for a zero range or frequency.
    /// * `MotorError::PinConflict` if a pin is held by another driver.
    /// * `MotorError::HardwareConfig` if the controller rejects a mode, frequency or range.
    pub fn new(gpio: &SharedGpio<G>, pins: PinAssignment) -> Result<Self, MotorError> {
        pins.validate()?;
        let vref = pins
            .vref
            .ok_or(MotorError::InvalidConfig("PWM-reference wiring needs a vref pin"))?;
        let claim = gpio.claim(&[pins.in1, pins.in2, vref])?;

        gpio.lock_sequence(|io| -> Result<(), MotorError> {
            for pin in [pins.in1, pins.in2, vref] {
                io.set_mode(pin, PinMode::Output)
                    .map_err(MotorError::config(pin))?;
            }
            io.set_pwm_frequency(vref, pins.pwm_freq)
                .map_err(MotorError::config(vref))?;
            // IN2 gets the range too, matching the deployed board setup.
            for pin in [vref, pins.in2] {
                io.set_pwm_range(pin, pins.pwm_range)
                    .map_err(MotorError::config(pin))?;
            }
            Ok(())
        })?;

        let mut driver = Self { claim, pins, vref };
        driver.free()?;
        info!(
            in1 = pins.in1,
            in2 = pins.in2,
            vref,
            pwm_range = pins.pwm_range,
            pwm_freq = pins.pwm_freq,
            "PWM-reference driver initialized"
        );
        Ok(driver)
    }

    fn write_pattern(&self, in1_level: Level, in2_level: Level, vref_duty: u32) -> Result<(), MotorError> {
        let (in1, in2, vref) = (self.pins.in1, self.pins.in2, self.vref);
        self.claim.gpio().lock_sequence(|io| {
            io.write(in1, in1_level)?;
            io.write(in2, in2_level)?;
            io.set_pwm_duty_cycle(vref, vref_duty)
        })?;
        debug!(%in1_level, %in2_level, vref_duty, "PWM-reference pattern written");
        Ok(())
    }
}

impl<G: GpioController> PinDriver for PwmReferenceDriver<G> {
    fn free(&mut self) -> Result<DriveState, MotorError> {
        self.write_pattern(Level::Low, Level::Low, 0)?;
        Ok(DriveState::Free)
    }

    fn brake(&mut self) -> Result<DriveState, MotorError> {
        self.write_pattern(Level::High, Level::High, 0)?;
        Ok(DriveState::Braking)
    }

    fn drive(&mut self, input_value: f64) -> Result<DriveState, MotorError> {
        let duty = duty_cycle(self.pins.pwm_range, input_value);
        if input_value > 0.0 {
            self.write_pattern(Level::High, Level::Low, duty)?;
            Ok(DriveState::Moving { direction: Direction::Forward, duty })
        } else if input_value < 0.0 {
            self.write_pattern(Level::Low, Level::High, duty)?;
            Ok(DriveState::Moving { direction: Direction::Backward, duty })
        } else {
            self.free()
        }
    }

    fn assignment(&self) -> &PinAssignment {
        &self.pins
    }
}
