//! End-to-end motor behavior against the in-memory controller.

use std::sync::Arc;
use std::thread;

use dcmotor::{
    DcMotor, GpioOp, GpioReadback, Level, MockGpio, MotorError, PinAssignment, PinMode, SharedGpio,
};
use proptest::prelude::*;

const IN1: u32 = 1;
const IN2: u32 = 2;

fn motor() -> (SharedGpio<MockGpio>, DcMotor<MockGpio>) {
    let gpio = SharedGpio::new(MockGpio::new());
    let motor = DcMotor::new(&gpio, PinAssignment::new(IN1, IN2)).unwrap();
    (gpio, motor)
}

fn duties(gpio: &SharedGpio<MockGpio>) -> (u32, u32) {
    gpio.lock_sequence(|io| (io.pwm_duty_cycle(IN1).unwrap(), io.pwm_duty_cycle(IN2).unwrap()))
}

#[test]
fn constructor_configures_defaults() {
    let (gpio, _motor) = motor();
    gpio.lock_sequence(|io| {
        for pin in [IN1, IN2] {
            assert_eq!(io.mode(pin).unwrap(), PinMode::Output);
            assert_eq!(io.pwm_range(pin).unwrap(), 255);
            assert_eq!(io.pwm_frequency(pin).unwrap(), 50);
            assert_eq!(io.pwm_duty_cycle(pin).unwrap(), 0);
        }
    });
}

#[test]
fn run_upper_limit() {
    let (gpio, mut motor) = motor();
    motor.run(Some(1.0), "move").unwrap();
    assert_eq!(duties(&gpio), (255, 0));
}

#[test]
fn run_lower_limit() {
    let (gpio, mut motor) = motor();
    motor.run(Some(-1.0), "move").unwrap();
    assert_eq!(duties(&gpio), (0, 255));
}

#[test]
fn run_zero() {
    let (gpio, mut motor) = motor();
    motor.run(Some(0.0), "move").unwrap();
    assert_eq!(duties(&gpio), (0, 0));
}

#[test]
fn run_inside_dead_zone() {
    let (gpio, mut motor) = motor();
    motor.run(Some(0.09), "move").unwrap();
    assert_eq!(duties(&gpio), (0, 0));
    motor.run(Some(-0.09), "move").unwrap();
    assert_eq!(duties(&gpio), (0, 0));
}

#[test]
fn run_on_dead_zone_boundary() {
    let (gpio, mut motor) = motor();
    motor.run(Some(0.1), "move").unwrap();
    assert_eq!(duties(&gpio), (25, 0));
    motor.run(Some(-0.1), "move").unwrap();
    assert_eq!(duties(&gpio), (0, 25));
}

#[test]
fn run_clamps_out_of_range() {
    let (gpio, mut motor) = motor();
    motor.run(Some(1.5), "move").unwrap();
    assert_eq!(duties(&gpio), (255, 0));
    motor.run(Some(-1.5), "move").unwrap();
    assert_eq!(duties(&gpio), (0, 255));
}

#[test]
fn brake_and_free_ignore_value() {
    let (gpio, mut motor) = motor();
    for value in [-1.0, 0.0, 0.3, 7.0] {
        motor.run(Some(value), "brake").unwrap();
        assert_eq!(duties(&gpio), (255, 255));
        motor.run(Some(value), "free").unwrap();
        assert_eq!(duties(&gpio), (0, 0));
    }
}

#[test]
fn reference_wiring_brake_and_free() {
    let gpio = SharedGpio::new(MockGpio::new());
    let mut motor = DcMotor::new(&gpio, PinAssignment::new(IN1, IN2).with_vref(3)).unwrap();

    motor.run(Some(0.9), "brake").unwrap();
    gpio.lock_sequence(|io| {
        assert_eq!(io.read(IN1).unwrap(), Level::High);
        assert_eq!(io.read(IN2).unwrap(), Level::High);
        assert_eq!(io.pwm_duty_cycle(3).unwrap(), 0);
    });

    motor.run(Some(0.9), "free").unwrap();
    gpio.lock_sequence(|io| {
        assert_eq!(io.read(IN1).unwrap(), Level::Low);
        assert_eq!(io.read(IN2).unwrap(), Level::Low);
        assert_eq!(io.pwm_duty_cycle(3).unwrap(), 0);
    });
}

#[test]
fn absent_value_is_noop() {
    let (gpio, mut motor) = motor();
    motor.run(Some(-0.5), "move").unwrap();
    let before = gpio.lock_sequence(|io| io.history().len());
    for status in ["move", "free", "brake", "whatever"] {
        motor.run(None, status).unwrap();
    }
    assert_eq!(gpio.lock_sequence(|io| io.history().len()), before);
    assert_eq!(duties(&gpio), (0, 127));
}

#[test]
fn repeated_command_is_idempotent() {
    let (gpio, mut motor) = motor();
    motor.run(Some(0.6), "move").unwrap();
    let first = duties(&gpio);
    motor.run(Some(0.6), "move").unwrap();
    assert_eq!(duties(&gpio), first);
}

#[test]
fn two_motors_cannot_share_a_pin() {
    let gpio = SharedGpio::new(MockGpio::new());
    let _left = DcMotor::new(&gpio, PinAssignment::new(38, 40)).unwrap();
    let right = DcMotor::new(&gpio, PinAssignment::new(40, 37));
    assert!(matches!(right, Err(MotorError::PinConflict(40))));

    let right = DcMotor::new(&gpio, PinAssignment::new(35, 37));
    assert!(right.is_ok());
}

#[test]
fn pin_is_free_again_after_motor_drops() {
    let gpio = SharedGpio::new(MockGpio::new());
    let motor = DcMotor::new(&gpio, PinAssignment::new(5, 6)).unwrap();
    drop(motor);
    assert!(DcMotor::new(&gpio, PinAssignment::new(5, 6)).is_ok());
}

#[test]
fn rejected_frequency_fails_construction() {
    let mut mock = MockGpio::new();
    mock.reject_config(IN1);
    let gpio = SharedGpio::new(mock);
    let result = DcMotor::new(&gpio, PinAssignment::new(IN1, IN2));
    assert!(matches!(result, Err(MotorError::HardwareConfig { pin: IN1, .. })));
}

#[test]
fn write_sequences_from_two_threads_never_interleave() {
    let gpio = SharedGpio::new(MockGpio::new());
    let left = DcMotor::new(&gpio, PinAssignment::new(10, 11)).unwrap();
    let right = DcMotor::new(&gpio, PinAssignment::new(12, 13)).unwrap();
    gpio.lock_sequence(|io| io.clear_history());

    let barrier = Arc::new(std::sync::Barrier::new(2));
    let handles: Vec<_> = [left, right]
        .into_iter()
        .map(|mut motor| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..200 {
                    let value = if i % 2 == 0 { 0.5 } else { -0.5 };
                    motor.run(Some(value), "move").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    gpio.lock_sequence(|io| {
        let history = io.history();
        assert_eq!(history.len(), 800);
        for pair in history.chunks(2) {
            let pins: Vec<u32> = pair
                .iter()
                .map(|op| match op {
                    GpioOp::DutyCycle(pin, _) => *pin,
                    other => panic!("unexpected op {other:?}"),
                })
                .collect();
            assert!(pins == [10, 11] || pins == [12, 13], "interleaved writes: {pair:?}");
        }
    });
}

proptest! {
    #[test]
    fn inside_dead_zone_always_frees(value in -0.0999f64..0.0999) {
        let (gpio, mut motor) = motor();
        motor.run(Some(value), "move").unwrap();
        prop_assert_eq!(duties(&gpio), (0, 0));
    }

    #[test]
    fn outside_dead_zone_truncates(value in 0.1f64..=1.0, negative in any::<bool>()) {
        let (gpio, mut motor) = motor();
        let signed = if negative { -value } else { value };
        motor.run(Some(signed), "move").unwrap();

        let expected = (255.0 * value) as u32;
        if negative {
            prop_assert_eq!(duties(&gpio), (0, expected));
        } else {
            prop_assert_eq!(duties(&gpio), (expected, 0));
        }
    }

    #[test]
    fn beyond_limits_saturates(excess in 1.0f64..1.0e6) {
        let (gpio, mut motor) = motor();
        motor.run(Some(excess), "move").unwrap();
        prop_assert_eq!(duties(&gpio), (255, 0));
        motor.run(Some(-excess), "move").unwrap();
        prop_assert_eq!(duties(&gpio), (0, 255));
    }
}
