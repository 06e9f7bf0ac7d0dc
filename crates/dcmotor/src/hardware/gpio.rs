//! GPIO/PWM controller surface the drivers write through.

use core::fmt;

use thiserror::Error;

/// GPIO number as the controller numbers it (BCM numbering on a Raspberry Pi).
pub type Pin = u32;

/// Direction mode of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Input pin.
    Input,
    /// Output pin, digital or PWM.
    Output,
}

impl PinMode {
    /// Numeric mode as used by pigpio (`INPUT = 0`, `OUTPUT = 1`).
    pub const fn code(self) -> u32 {
        match self {
            PinMode::Input => 0,
            PinMode::Output => 1,
        }
    }

    /// Inverse of [`PinMode::code`]. Alternate-function modes map to `None`.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(PinMode::Input),
            1 => Some(PinMode::Output),
            _ => None,
        }
    }
}

/// Digital output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic 0.
    Low,
    /// Logic 1.
    High,
}

impl Level {
    /// `0` or `1`.
    pub const fn bit(self) -> u32 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    /// Any non-zero value reads as `High`.
    pub const fn from_bit(bit: u32) -> Self {
        if bit == 0 { Level::Low } else { Level::High }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// Errors reported by a GPIO controller.
#[derive(Error, Debug)]
pub enum GpioError {
    /// The controller answered with an error code.
    #[error("{op} on pin {pin} rejected by controller ({})", code_name(.code))]
    Rejected {
        /// Primitive that failed.
        op: &'static str,
        /// Pin it was issued for.
        pin: Pin,
        /// Controller error code (negative for pigpio).
        code: i32,
    },

    /// A readback asked for a value that was never written.
    #[error("{what} of pin {pin} has not been configured")]
    NotConfigured {
        /// Pin that was queried.
        pin: Pin,
        /// Which property was queried.
        what: &'static str,
    },

    /// Transport to the controller failed.
    #[error("controller connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The controller replied with something that does not match the request.
    #[error("controller protocol error: {0}")]
    Protocol(String),
}

fn code_name(code: &i32) -> &'static str {
    describe_code(*code)
}

/// Symbolic name for the pigpio error codes the drivers can run into.
pub fn describe_code(code: i32) -> &'static str {
    match code {
        -2 => "PI_BAD_USER_GPIO",
        -3 => "PI_BAD_GPIO",
        -4 => "PI_BAD_MODE",
        -5 => "PI_BAD_LEVEL",
        -8 => "PI_BAD_DUTYCYCLE",
        -21 => "PI_BAD_DUTYRANGE",
        -41 => "PI_NOT_PERMITTED",
        _ => "unknown error",
    }
}

/// Write primitives of a GPIO/PWM controller.
///
/// These are all a driver needs. Implementations are expected to apply each
/// write immediately and report failure synchronously.
pub trait GpioController {
    /// Set the direction mode of a pin.
    fn set_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), GpioError>;

    /// Set the PWM frequency of a pin in Hz.
    fn set_pwm_frequency(&mut self, pin: Pin, hz: u32) -> Result<(), GpioError>;

    /// Set the number of duty-cycle steps of a pin.
    fn set_pwm_range(&mut self, pin: Pin, range: u32) -> Result<(), GpioError>;

    /// Drive a pin to a digital level.
    fn write(&mut self, pin: Pin, level: Level) -> Result<(), GpioError>;

    /// Set the PWM duty cycle of a pin, in `[0, range]`.
    fn set_pwm_duty_cycle(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError>;
}

/// Read side of a controller, used for verification and diagnostics only.
pub trait GpioReadback {
    /// Current mode of a pin.
    fn mode(&mut self, pin: Pin) -> Result<PinMode, GpioError>;

    /// Configured PWM frequency in Hz.
    fn pwm_frequency(&mut self, pin: Pin) -> Result<u32, GpioError>;

    /// Configured PWM range.
    fn pwm_range(&mut self, pin: Pin) -> Result<u32, GpioError>;

    /// Last PWM duty cycle written.
    fn pwm_duty_cycle(&mut self, pin: Pin) -> Result<u32, GpioError>;

    /// Current digital level.
    fn read(&mut self, pin: Pin) -> Result<Level, GpioError>;
}
