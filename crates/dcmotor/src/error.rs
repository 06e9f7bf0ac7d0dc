//! Error types for the motor driver.

use thiserror::Error;

use crate::hardware::gpio::{GpioError, Pin};

/// Errors raised while constructing or driving a motor.
#[derive(Error, Debug)]
pub enum MotorError {
    /// The controller refused a pin mode, PWM frequency or PWM range at construction.
    /// Not retried; the caller decides whether startup continues.
    #[error("hardware configuration rejected on pin {pin}: {source}")]
    HardwareConfig {
        /// Pin whose configuration failed.
        pin: Pin,
        /// Underlying controller error.
        #[source]
        source: GpioError,
    },

    /// A pin is already owned by another live driver on the same controller handle,
    /// or was listed twice in one assignment.
    #[error("pin {0} is already claimed")]
    PinConflict(Pin),

    /// A configuration value is outside what the driver accepts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The command value is NaN or infinite.
    #[error("invalid motor command value: {0}")]
    InvalidCommand(f64),

    /// A pin write failed partway through an action. Pins written before the
    /// failure keep their new state.
    #[error("pin write failed: {0}")]
    Gpio(#[from] GpioError),
}

impl MotorError {
    pub(crate) fn config(pin: Pin) -> impl FnOnce(GpioError) -> MotorError {
        move |source| MotorError::HardwareConfig { pin, source }
    }
}
