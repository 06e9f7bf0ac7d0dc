//! Motor controller: dead zone and status dispatch in front of an H-bridge.

use core::fmt;

use tracing::{debug, info};

use crate::devices::hbridge::HBridge;
use crate::error::MotorError;
use crate::hardware::gpio::GpioController;
use crate::hardware::shared::SharedGpio;
use crate::traits::driver::{DriveState, PinAssignment, PinDriver};

/// Default half-width of the dead zone around zero.
pub const DEFAULT_EPSILON: f64 = 0.1;

/// What the motor should do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorStatus {
    /// Drive according to the command value.
    #[default]
    Move,
    /// Remove power and coast.
    Free,
    /// Short the terminals.
    Brake,
}

impl MotorStatus {
    /// Parse a status string. `"brake"` and `"free"` are recognized; anything
    /// else, including unknown strings, means `Move`.
    pub fn parse(status: &str) -> Self {
        match status {
            "brake" => MotorStatus::Brake,
            "free" => MotorStatus::Free,
            _ => MotorStatus::Move,
        }
    }

    /// Canonical string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            MotorStatus::Move => "move",
            MotorStatus::Free => "free",
            MotorStatus::Brake => "brake",
        }
    }
}

impl From<&str> for MotorStatus {
    fn from(status: &str) -> Self {
        MotorStatus::parse(status)
    }
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One control cycle's input for one motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    /// Normalized command, nominally `[-1.0, 1.0]`. `None` until the producer
    /// has emitted anything.
    pub value: Option<f64>,
    /// Requested mode.
    pub status: MotorStatus,
}

impl MotorCommand {
    /// Construct a command.
    pub const fn new(value: Option<f64>, status: MotorStatus) -> Self {
        MotorCommand { value, status }
    }

    /// Command from the raw `(value, status string)` pair the control loop stores.
    pub fn from_raw(value: Option<f64>, status: &str) -> Self {
        MotorCommand::new(value, MotorStatus::parse(status))
    }
}

/// Clamp to `[-1.0, 1.0]` and zero out `(-epsilon, epsilon)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadZone {
    epsilon: f64,
}

impl DeadZone {
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidConfig)` if `epsilon` is negative or not finite.
    pub fn new(epsilon: f64) -> Result<Self, MotorError> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(MotorError::InvalidConfig("epsilon must be finite and non-negative"));
        }
        Ok(DeadZone { epsilon })
    }

    /// Half-width of the zeroed interval.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Correct a raw command.
    ///
    /// The epsilon compare is strict: a value of exactly `epsilon` passes through.
    pub fn apply(&self, value: f64) -> f64 {
        if value < -1.0 {
            -1.0
        } else if value > 1.0 {
            1.0
        } else if value.abs() < self.epsilon {
            0.0
        } else {
            value
        }
    }
}

impl Default for DeadZone {
    fn default() -> Self {
        DeadZone { epsilon: DEFAULT_EPSILON }
    }
}

/// One DC motor: a dead zone in front of an H-bridge driver.
///
/// Holds no state besides the driver and its configuration. Each call fully
/// determines the resulting pin pattern, so re-issuing a command after a fault
/// is always safe.
pub struct DcMotor<G: GpioController> {
    driver: HBridge<G>,
    dead_zone: DeadZone,
}

impl<G: GpioController> DcMotor<G> {
    /// Build a motor with the default dead zone (`0.1`).
    pub fn new(gpio: &SharedGpio<G>, pins: PinAssignment) -> Result<Self, MotorError> {
        Self::with_epsilon(gpio, pins, DEFAULT_EPSILON)
    }

    /// Build a motor with a custom dead zone.
    ///
    /// The wiring follows `pins`: dual-PWM unless a `vref` pin is given.
    pub fn with_epsilon(
        gpio: &SharedGpio<G>,
        pins: PinAssignment,
        epsilon: f64,
    ) -> Result<Self, MotorError> {
        let dead_zone = DeadZone::new(epsilon)?;
        let driver = HBridge::new(gpio, pins)?;
        info!(wiring = driver.wiring(), in1 = pins.in1, in2 = pins.in2, epsilon, "DC motor ready");
        Ok(DcMotor { driver, dead_zone })
    }

    /// Apply one cycle's raw `(value, status)` pair.
    ///
    /// A `None` value writes nothing.
    pub fn run(&mut self, motor_value: Option<f64>, motor_status: &str) -> Result<(), MotorError> {
        self.apply(MotorCommand::from_raw(motor_value, motor_status))
            .map(drop)
    }

    /// Apply a typed command and return the pattern written, or `None` when the
    /// command carried no value.
    ///
    /// # Errors
    ///
    /// * `MotorError::InvalidCommand` for a NaN or infinite value with status `Move`.
    ///   Nothing is written in that case.
    /// * `MotorError::Gpio` if a pin write fails.
    pub fn apply(&mut self, command: MotorCommand) -> Result<Option<DriveState>, MotorError> {
        let Some(value) = command.value else {
            return Ok(None);
        };

        let state = match command.status {
            MotorStatus::Brake => self.driver.brake()?,
            MotorStatus::Free => self.driver.free()?,
            MotorStatus::Move => {
                if !value.is_finite() {
                    return Err(MotorError::InvalidCommand(value));
                }
                self.driver.drive(self.dead_zone.apply(value))?
            }
        };
        debug!(value, status = %command.status, %state, "Motor command applied");
        Ok(Some(state))
    }

    /// De-energize the motor. Call when the control loop ends.
    pub fn shutdown(&mut self) -> Result<(), MotorError> {
        self.driver.free()?;
        info!(in1 = self.driver.assignment().in1, "DC motor shut down");
        Ok(())
    }

    /// Dead zone in use.
    pub fn dead_zone(&self) -> DeadZone {
        self.dead_zone
    }

    /// Underlying driver.
    pub fn driver(&self) -> &HBridge<G> {
        &self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::gpio::{GpioReadback, Level};
    use crate::hardware::mock::MockGpio;
    use crate::traits::driver::Direction;

    fn motor() -> (SharedGpio<MockGpio>, DcMotor<MockGpio>) {
        let gpio = SharedGpio::new(MockGpio::new());
        let motor = DcMotor::new(&gpio, PinAssignment::new(1, 2)).unwrap();
        (gpio, motor)
    }

    fn duties(gpio: &SharedGpio<MockGpio>) -> (u32, u32) {
        gpio.lock_sequence(|io| (io.pwm_duty_cycle(1).unwrap(), io.pwm_duty_cycle(2).unwrap()))
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(MotorStatus::parse("brake"), MotorStatus::Brake);
        assert_eq!(MotorStatus::parse("free"), MotorStatus::Free);
        assert_eq!(MotorStatus::parse("move"), MotorStatus::Move);
        assert_eq!(MotorStatus::parse("BRAKE"), MotorStatus::Move);
        assert_eq!(MotorStatus::parse(""), MotorStatus::Move);
        assert_eq!(MotorStatus::from("free").to_string(), "free");
    }

    #[test]
    fn test_dead_zone() {
        let dz = DeadZone::default();
        assert_eq!(dz.apply(0.09), 0.0);
        assert_eq!(dz.apply(-0.09), 0.0);
        assert_eq!(dz.apply(0.1), 0.1);
        assert_eq!(dz.apply(-0.1), -0.1);
        assert_eq!(dz.apply(1.5), 1.0);
        assert_eq!(dz.apply(-1.5), -1.0);
        assert_eq!(dz.apply(0.42), 0.42);
    }

    #[test]
    fn test_dead_zone_rejects_bad_epsilon() {
        assert!(DeadZone::new(-0.1).is_err());
        assert!(DeadZone::new(f64::NAN).is_err());
        assert_eq!(DeadZone::new(0.0).unwrap().apply(0.001), 0.001);
    }

    #[test]
    fn test_run_dispatch() {
        let (gpio, mut motor) = motor();

        motor.run(Some(0.5), "move").unwrap();
        assert_eq!(duties(&gpio), (127, 0));

        motor.run(Some(0.5), "brake").unwrap();
        assert_eq!(duties(&gpio), (255, 255));

        motor.run(Some(0.5), "free").unwrap();
        assert_eq!(duties(&gpio), (0, 0));
    }

    #[test]
    fn test_unknown_status_moves() {
        let (gpio, mut motor) = motor();
        motor.run(Some(-1.0), "reverse").unwrap();
        assert_eq!(duties(&gpio), (0, 255));
    }

    #[test]
    fn test_absent_value_writes_nothing() {
        let (gpio, mut motor) = motor();
        motor.run(Some(0.8), "move").unwrap();
        gpio.lock_sequence(|io| io.clear_history());

        assert_eq!(motor.apply(MotorCommand::from_raw(None, "brake")).unwrap(), None);
        motor.run(None, "move").unwrap();
        gpio.lock_sequence(|io| assert!(io.history().is_empty()));
        assert_eq!(duties(&gpio), (204, 0));
    }

    #[test]
    fn test_apply_reports_state() {
        let (_gpio, mut motor) = motor();
        let state = motor.apply(MotorCommand::new(Some(-0.1), MotorStatus::Move)).unwrap();
        assert_eq!(state, Some(DriveState::Moving { direction: Direction::Backward, duty: 25 }));
        let state = motor.apply(MotorCommand::new(Some(0.05), MotorStatus::Move)).unwrap();
        assert_eq!(state, Some(DriveState::Free));
    }

    #[test]
    fn test_non_finite_value() {
        let (gpio, mut motor) = motor();
        motor.run(Some(0.3), "move").unwrap();
        gpio.lock_sequence(|io| io.clear_history());

        let err = motor.run(Some(f64::NAN), "move").unwrap_err();
        assert!(matches!(err, MotorError::InvalidCommand(v) if v.is_nan()));
        assert!(motor.run(Some(f64::INFINITY), "move").is_err());
        gpio.lock_sequence(|io| assert!(io.history().is_empty()));

        // Brake and free never look at the value.
        motor.run(Some(f64::NAN), "brake").unwrap();
        assert_eq!(duties(&gpio), (255, 255));
    }

    #[test]
    fn test_shutdown_frees() {
        let (gpio, mut motor) = motor();
        motor.run(Some(1.0), "move").unwrap();
        motor.shutdown().unwrap();
        assert_eq!(duties(&gpio), (0, 0));
    }

    #[test]
    fn test_reference_wiring_through_motor() {
        let gpio = SharedGpio::new(MockGpio::new());
        let pins = PinAssignment::new(1, 2).with_vref(3);
        let mut motor = DcMotor::with_epsilon(&gpio, pins, 0.2).unwrap();
        assert_eq!(motor.driver().wiring(), "pwm-reference");

        motor.run(Some(0.15), "move").unwrap();
        gpio.lock_sequence(|io| {
            assert_eq!(io.read(1).unwrap(), Level::Low);
            assert_eq!(io.read(2).unwrap(), Level::Low);
            assert_eq!(io.pwm_duty_cycle(3).unwrap(), 0);
        });

        motor.run(Some(0.2), "move").unwrap();
        gpio.lock_sequence(|io| {
            assert_eq!(io.read(1).unwrap(), Level::High);
            assert_eq!(io.pwm_duty_cycle(3).unwrap(), 51);
        });
    }

    #[test]
    fn test_invalid_epsilon_claims_nothing() {
        let gpio = SharedGpio::new(MockGpio::new());
        let result = DcMotor::with_epsilon(&gpio, PinAssignment::new(1, 2), -1.0);
        assert!(matches!(result, Err(MotorError::InvalidConfig(_))));
        assert!(gpio.claimed_pins().is_empty());
    }

    #[test]
    fn test_epsilon_is_kept() {
        let gpio = SharedGpio::new(MockGpio::new());
        let default = DcMotor::new(&gpio, PinAssignment::new(1, 2)).unwrap();
        assert_eq!(default.dead_zone().epsilon(), DEFAULT_EPSILON);

        let mut custom = DcMotor::with_epsilon(&gpio, PinAssignment::new(3, 4), 0.25).unwrap();
        assert_eq!(custom.dead_zone().epsilon(), 0.25);
        let state = custom.apply(MotorCommand::from_raw(Some(0.2), "move")).unwrap();
        assert_eq!(state, Some(DriveState::Free));
    }
}
