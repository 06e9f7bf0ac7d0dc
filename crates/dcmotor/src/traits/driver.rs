//! Pin assignment, drive states and the trait every H-bridge wiring implements.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MotorError;
use crate::hardware::gpio::Pin;

/// Default number of duty-cycle steps.
pub const DEFAULT_PWM_RANGE: u32 = 255;
/// Default PWM frequency in Hz.
pub const DEFAULT_PWM_FREQ: u32 = 50;

/// Pins and PWM settings for one motor's H-bridge.
///
/// Owned by exactly one driver. Immutable once the driver is built.
///
/// When deserialized, `in1` and `in2` are required; there is no default pin.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    /// Pin wired to IN1 (the forward path).
    pub in1: Pin,
    /// Pin wired to IN2 (the backward path).
    pub in2: Pin,
    /// Pin wired to Vref. When present the PWM-reference wiring is used.
    #[cfg_attr(feature = "serde", serde(default))]
    pub vref: Option<Pin>,
    /// Number of discrete duty-cycle steps.
    #[cfg_attr(feature = "serde", serde(default = "default_pwm_range"))]
    pub pwm_range: u32,
    /// PWM frequency in Hz.
    #[cfg_attr(feature = "serde", serde(default = "default_pwm_freq"))]
    pub pwm_freq: u32,
}

#[cfg(feature = "serde")]
fn default_pwm_range() -> u32 {
    DEFAULT_PWM_RANGE
}

#[cfg(feature = "serde")]
fn default_pwm_freq() -> u32 {
    DEFAULT_PWM_FREQ
}

impl PinAssignment {
    /// Two-pin assignment with default range and frequency.
    pub const fn new(in1: Pin, in2: Pin) -> Self {
        PinAssignment {
            in1,
            in2,
            vref: None,
            pwm_range: DEFAULT_PWM_RANGE,
            pwm_freq: DEFAULT_PWM_FREQ,
        }
    }

    /// Add a Vref pin, selecting the PWM-reference wiring.
    pub const fn with_vref(mut self, vref: Pin) -> Self {
        self.vref = Some(vref);
        self
    }

    /// Override the PWM range and frequency.
    pub const fn with_pwm(mut self, pwm_range: u32, pwm_freq: u32) -> Self {
        self.pwm_range = pwm_range;
        self.pwm_freq = pwm_freq;
        self
    }

    /// Every pin this assignment uses, in role order.
    pub fn pins(&self) -> Vec<Pin> {
        let mut pins = vec![self.in1, self.in2];
        pins.extend(self.vref);
        pins
    }

    pub(crate) fn validate(&self) -> Result<(), MotorError> {
        if self.pwm_range == 0 {
            return Err(MotorError::InvalidConfig("pwm_range must be positive"));
        }
        if self.pwm_freq == 0 {
            return Err(MotorError::InvalidConfig("pwm_freq must be positive"));
        }
        Ok(())
    }
}

/// Rotation direction of a driven motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Current flows through the IN1 path.
    Forward,
    /// Current flows through the IN2 path.
    Backward,
}

/// Pin pattern a driver action leaves on the H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    /// No drive voltage; the motor coasts.
    Free,
    /// Driven in `direction` at `duty` out of the configured range.
    Moving {
        /// Which path is energized.
        direction: Direction,
        /// Duty cycle written.
        duty: u32,
    },
    /// Terminals held at the same potential.
    Braking,
}

impl fmt::Display for DriveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveState::Free => write!(f, "free"),
            DriveState::Moving { direction: Direction::Forward, duty } => write!(f, "forward@{duty}"),
            DriveState::Moving { direction: Direction::Backward, duty } => write!(f, "backward@{duty}"),
            DriveState::Braking => write!(f, "brake"),
        }
    }
}

/// Convert a command magnitude to a duty cycle in `[0, pwm_range]`.
///
/// The product is truncated toward zero, never rounded: `0.1` of `255` is `25`.
pub fn duty_cycle(pwm_range: u32, input_value: f64) -> u32 {
    (f64::from(pwm_range) * input_value.abs()) as u32
}

/// The three canonical actions of one H-bridge wiring.
///
/// Every action rewrites the full pin pattern, so none depends on what was
/// written before and repeating one is harmless.
pub trait PinDriver {
    /// De-energize the motor.
    fn free(&mut self) -> Result<DriveState, MotorError>;

    /// Short the motor terminals.
    fn brake(&mut self) -> Result<DriveState, MotorError>;

    /// Drive with a signed command already clamped to `[-1.0, 1.0]`.
    ///
    /// Positive drives forward, negative backward, exactly zero frees.
    fn drive(&mut self, input_value: f64) -> Result<DriveState, MotorError>;

    /// Pins and PWM settings in use.
    fn assignment(&self) -> &PinAssignment;
}
