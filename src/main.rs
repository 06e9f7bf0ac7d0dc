mod backend; // runtime choice of GPIO controller
mod blackboard; // key/value memory the motors read from
mod settings; // TOML + environment configuration
mod vehicle; // drive loop

use std::sync::atomic::Ordering;

use anyhow::Context;
use dcmotor::SharedGpio;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use backend::Backend;
use blackboard::Blackboard;
use settings::{DEFAULT_CONFIG_PATH, load_config};
use vehicle::{MotorPart, Vehicle};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = load_config(&path).with_context(|| format!("loading configuration from {path}"))?;

    let backend = Backend::open(&cfg.gpio).context("opening GPIO backend")?;
    info!(backend = backend.name(), "GPIO backend ready");
    let gpio = SharedGpio::new(backend);

    let mut vehicle = Vehicle::new(&cfg.vehicle, Blackboard::default())?;
    for (key, value) in &cfg.inputs {
        blackboard::put(vehicle.memory(), key, value.clone());
    }
    vehicle.add(MotorPart::new("left", &gpio, &cfg.motors.left).context("setting up left motor")?);
    vehicle.add(MotorPart::new("right", &gpio, &cfg.motors.right).context("setting up right motor")?);

    let stop = vehicle.stop_handle();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping vehicle");
        stop.store(true, Ordering::Relaxed);
    })
    .context("installing Ctrl-C handler")?;

    match vehicle.start() {
        Ok(loops) => {
            info!(loops, "Vehicle stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Vehicle stopped on fault");
            Err(e).context("drive loop")
        }
    }
}
