//! H-bridge wired with two PWM pins and no Vref line.
//!
//! | IN1  | IN2  | Motor state                    |
//! |------|------|--------------------------------|
//! | 0    | 0    | Free (coast)                   |
//! | PWM  | 0    | Forward, speed = duty cycle    |
//! | 0    | PWM  | Backward, speed = duty cycle   |
//! | full | full | Brake (windings shorted)       |

use tracing::{debug, info};

use crate::error::MotorError;
use crate::hardware::gpio::{GpioController, PinMode};
use crate::hardware::shared::{PinClaim, SharedGpio};
use crate::traits::driver::{Direction, DriveState, PinAssignment, PinDriver, duty_cycle};

/// Driver for the two-PWM wiring. Uses fewer pins than the reference wiring
/// at the cost of a second PWM channel.
pub struct DualPwmDriver<G: GpioController> {
    claim: PinClaim<G>,
    pins: PinAssignment,
}

impl<G: GpioController> DualPwmDriver<G> {
    /// Claim IN1 and IN2, configure both as PWM outputs, and leave the motor free.
    ///
    /// A `vref` in `pins` is ignored by this wiring.
    ///
    /// # Errors
    ///
    /// * `MotorError::PinConflict` if a pin is held by another driver.
    /// * `MotorError::HardwareConfig` if the controller rejects a mode, frequency or range.
    /// * `MotorError::InvalidConfig` for a zero range or frequency.
    pub fn new(gpio: &SharedGpio<G>, pins: PinAssignment) -> Result<Self, MotorError> {
        pins.validate()?;
        let claim = gpio.claim(&[pins.in1, pins.in2])?;

        gpio.lock_sequence(|io| -> Result<(), MotorError> {
            for pin in [pins.in1, pins.in2] {
                io.set_mode(pin, PinMode::Output)
                    .map_err(MotorError::config(pin))?;
            }
            for pin in [pins.in1, pins.in2] {
                io.set_pwm_frequency(pin, pins.pwm_freq)
                    .map_err(MotorError::config(pin))?;
            }
            for pin in [pins.in1, pins.in2] {
                io.set_pwm_range(pin, pins.pwm_range)
                    .map_err(MotorError::config(pin))?;
            }
            Ok(())
        })?;

        let mut driver = Self { claim, pins };
        driver.free()?;
        info!(
            in1 = pins.in1,
            in2 = pins.in2,
            pwm_range = pins.pwm_range,
            pwm_freq = pins.pwm_freq,
            "Dual-PWM driver initialized"
        );
        Ok(driver)
    }

    fn write_duties(&self, in1_duty: u32, in2_duty: u32) -> Result<(), MotorError> {
        let (in1, in2) = (self.pins.in1, self.pins.in2);
        self.claim.gpio().lock_sequence(|io| {
            io.set_pwm_duty_cycle(in1, in1_duty)?;
            io.set_pwm_duty_cycle(in2, in2_duty)
        })?;
        debug!(in1, in1_duty, in2, in2_duty, "Dual-PWM duties written");
        Ok(())
    }
}

impl<G: GpioController> PinDriver for DualPwmDriver<G> {
    fn free(&mut self) -> Result<DriveState, MotorError> {
        self.write_duties(0, 0)?;
        Ok(DriveState::Free)
    }

    fn brake(&mut self) -> Result<DriveState, MotorError> {
        let full = self.pins.pwm_range;
        self.write_duties(full, full)?;
        Ok(DriveState::Braking)
    }

    fn drive(&mut self, input_value: f64) -> Result<DriveState, MotorError> {
        let duty = duty_cycle(self.pins.pwm_range, input_value);
        if input_value > 0.0 {
            self.write_duties(duty, 0)?;
            Ok(DriveState::Moving { direction: Direction::Forward, duty })
        } else if input_value < 0.0 {
            self.write_duties(0, duty)?;
            Ok(DriveState::Moving { direction: Direction::Backward, duty })
        } else {
            self.free()
        }
    }

    fn assignment(&self) -> &PinAssignment {
        &self.pins
    }
}
