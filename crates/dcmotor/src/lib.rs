#![warn(missing_docs)]
#![doc = "Dual H-bridge DC motor driver for single-board-computer vehicles."]
#![doc = ""]
#![doc = "A [`DcMotor`] takes a normalized command in `[-1.0, 1.0]` plus a move/free/brake"]
#![doc = "status once per control cycle, applies a dead zone around zero, and drives one"]
#![doc = "H-bridge through a [`PinDriver`] wired either with two PWM pins or with two"]
#![doc = "digital pins and a PWM reference pin."]

pub mod devices;
pub mod error;
pub mod hardware;
pub mod traits;

pub use devices::dual_pwm::DualPwmDriver;
pub use devices::hbridge::HBridge;
pub use devices::motor::{DcMotor, DeadZone, MotorCommand, MotorStatus, DEFAULT_EPSILON};
pub use devices::pwm_reference::PwmReferenceDriver;
pub use error::MotorError;
pub use hardware::gpio::{GpioController, GpioError, GpioReadback, Level, Pin, PinMode};
pub use hardware::mock::{GpioOp, MockGpio};
pub use hardware::pigpio::PigpioClient;
pub use hardware::shared::{PinClaim, SharedGpio};
pub use traits::driver::{Direction, DriveState, PinAssignment, PinDriver, duty_cycle};
