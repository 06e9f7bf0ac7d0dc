//! Wiring selection over the two H-bridge drivers.

use tracing::debug;

use crate::devices::dual_pwm::DualPwmDriver;
use crate::devices::pwm_reference::PwmReferenceDriver;
use crate::error::MotorError;
use crate::hardware::gpio::GpioController;
use crate::hardware::shared::SharedGpio;
use crate::traits::driver::{DriveState, PinAssignment, PinDriver};

/// Either wiring, chosen when the motor is built.
pub enum HBridge<G: GpioController> {
    /// Two PWM pins, no Vref.
    DualPwm(DualPwmDriver<G>),
    /// Two digital pins plus a PWM Vref pin.
    PwmReference(PwmReferenceDriver<G>),
}

impl<G: GpioController> HBridge<G> {
    /// Build the wiring `pins` describes: PWM-reference when a `vref` pin is
    /// given, dual-PWM otherwise.
    pub fn new(gpio: &SharedGpio<G>, pins: PinAssignment) -> Result<Self, MotorError> {
        let bridge = match pins.vref {
            Some(_) => HBridge::PwmReference(PwmReferenceDriver::new(gpio, pins)?),
            None => HBridge::DualPwm(DualPwmDriver::new(gpio, pins)?),
        };
        debug!(wiring = bridge.wiring(), "H-bridge selected");
        Ok(bridge)
    }

    /// Short name of the wiring, for logs.
    pub fn wiring(&self) -> &'static str {
        match self {
            HBridge::DualPwm(_) => "dual-pwm",
            HBridge::PwmReference(_) => "pwm-reference",
        }
    }
}

impl<G: GpioController> PinDriver for HBridge<G> {
    fn free(&mut self) -> Result<DriveState, MotorError> {
        match self {
            HBridge::DualPwm(d) => d.free(),
            HBridge::PwmReference(d) => d.free(),
        }
    }

    fn brake(&mut self) -> Result<DriveState, MotorError> {
        match self {
            HBridge::DualPwm(d) => d.brake(),
            HBridge::PwmReference(d) => d.brake(),
        }
    }

    fn drive(&mut self, input_value: f64) -> Result<DriveState, MotorError> {
        match self {
            HBridge::DualPwm(d) => d.drive(input_value),
            HBridge::PwmReference(d) => d.drive(input_value),
        }
    }

    fn assignment(&self) -> &PinAssignment {
        match self {
            HBridge::DualPwm(d) => d.assignment(),
            HBridge::PwmReference(d) => d.assignment(),
        }
    }
}
