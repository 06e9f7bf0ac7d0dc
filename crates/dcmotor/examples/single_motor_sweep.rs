//! Sweep one motor forward, brake, sweep backward, coast.
//!
//! Talks to pigpiod when `PIGPIO_HOST` is set, otherwise runs against the
//! in-memory controller and only logs.

use std::thread;
use std::time::Duration;

use dcmotor::hardware::pigpio::DEFAULT_PORT;
use dcmotor::{DcMotor, GpioController, MockGpio, PigpioClient, PinAssignment, SharedGpio};
use tracing::info;

const IN1: u32 = 20; // IN1 of the H-bridge
const IN2: u32 = 21; // IN2 of the H-bridge
const STEP_TIME_MS: u64 = 500; // Time between speed changes
const STEPS: i32 = 5;

fn sweep<G: GpioController>(gpio: SharedGpio<G>) -> anyhow::Result<()> {
    let mut motor = DcMotor::new(&gpio, PinAssignment::new(IN1, IN2))?;
    info!("Motor initialized");

    for step in 0..=STEPS {
        let value = f64::from(step) / f64::from(STEPS);
        info!(value, "Forward");
        motor.run(Some(value), "move")?;
        thread::sleep(Duration::from_millis(STEP_TIME_MS));
    }

    info!("Braking");
    motor.run(Some(0.0), "brake")?;
    thread::sleep(Duration::from_millis(STEP_TIME_MS));

    for step in 0..=STEPS {
        let value = -f64::from(step) / f64::from(STEPS);
        info!(value, "Backward");
        motor.run(Some(value), "move")?;
        thread::sleep(Duration::from_millis(STEP_TIME_MS));
    }

    motor.shutdown()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    match std::env::var("PIGPIO_HOST") {
        Ok(host) => {
            let client = PigpioClient::connect(&host, DEFAULT_PORT, Duration::from_secs(1))?;
            sweep(SharedGpio::new(client))
        }
        Err(_) => sweep(SharedGpio::new(MockGpio::new())),
    }
}
