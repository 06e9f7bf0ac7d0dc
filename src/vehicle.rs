use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::bail;
use dcmotor::{DcMotor, GpioController, MotorError, SharedGpio};
use spin_sleep::SpinSleeper;
use tracing::{debug, error, info, warn};

use crate::blackboard::{self, Blackboard};
use crate::settings::{MotorConfig, VehicleConfig};

/// A motor bound to the memory keys it reads its commands from.
pub struct MotorPart<G: GpioController> {
    name: String,
    motor: DcMotor<G>,
    value_key: String,
    status_key: String,
}

impl<G: GpioController> MotorPart<G> {
    pub fn new(name: &str, gpio: &SharedGpio<G>, cfg: &MotorConfig) -> Result<Self, MotorError> {
        let motor = DcMotor::with_epsilon(gpio, cfg.pins, cfg.epsilon)?;
        Ok(MotorPart {
            name: name.to_string(),
            motor,
            value_key: cfg.value_key.clone(),
            status_key: cfg.status_key.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read this cycle's command from memory and apply it.
    ///
    /// A missing status reads as an empty string, which drives the motor.
    pub fn update(&mut self, memory: &Blackboard) -> Result<(), MotorError> {
        let value = blackboard::get_float(memory, &self.value_key);
        let status = blackboard::get_text(memory, &self.status_key).unwrap_or_default();
        self.motor.run(value, &status)
    }

    pub fn shutdown(&mut self) -> Result<(), MotorError> {
        self.motor.shutdown()
    }
}

/// Fixed-rate drive loop over a set of motor parts.
pub struct Vehicle<G: GpioController> {
    parts: Vec<MotorPart<G>>,
    memory: Blackboard,
    period: Duration,
    max_loops: u64,
    halt_on_fault: bool,
    stop: Arc<AtomicBool>,
}

impl<G: GpioController> Vehicle<G> {
    pub fn new(cfg: &VehicleConfig, memory: Blackboard) -> anyhow::Result<Self> {
        if cfg.drive_loop_hz == 0 {
            bail!("drive_loop_hz must be greater than zero");
        }
        Ok(Vehicle {
            parts: Vec::new(),
            memory,
            period: Duration::from_secs(1) / cfg.drive_loop_hz,
            max_loops: cfg.max_loops,
            halt_on_fault: cfg.halt_on_fault,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn add(&mut self, part: MotorPart<G>) {
        info!(part = part.name(), "Part added to vehicle");
        self.parts.push(part);
    }

    /// Flag that ends the loop after the current cycle once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn memory(&self) -> &Blackboard {
        &self.memory
    }

    /// Run until `max_loops` cycles (`0` = no limit), a stop request, or a
    /// fault under `halt_on_fault`. Every motor is freed before returning.
    ///
    /// Returns the number of completed cycles.
    pub fn start(&mut self) -> Result<u64, MotorError> {
        info!(
            parts = self.parts.len(),
            period = ?self.period,
            max_loops = self.max_loops,
            "Drive loop starting"
        );
        let sleeper = SpinSleeper::default();
        let mut loops = 0u64;
        let mut outcome = Ok(());

        'drive: while !self.stop.load(Ordering::Relaxed) {
            if self.max_loops != 0 && loops >= self.max_loops {
                break;
            }
            let cycle_start = Instant::now();

            for part in &mut self.parts {
                if let Err(e) = part.update(&self.memory) {
                    blackboard::raise_fault(&self.memory, &format!("{}: {e}", part.name()));
                    if self.halt_on_fault {
                        error!(part = part.name(), error = %e, "Motor fault, halting vehicle");
                        outcome = Err(e);
                        break 'drive;
                    }
                    warn!(part = part.name(), error = %e, "Motor fault, skipping cycle");
                    break;
                }
            }
            loops += 1;

            let elapsed = cycle_start.elapsed();
            match self.period.checked_sub(elapsed) {
                Some(remaining) => sleeper.sleep(remaining),
                None => debug!(?elapsed, "Drive loop overran its period"),
            }
        }

        let state = blackboard::snapshot(&self.memory);
        info!(loops, since_last_command = ?state.last_cmd_ts.elapsed(), "Drive loop stopped");
        if !state.faults.is_empty() {
            warn!(faults = ?state.faults, "Faults raised during run");
        }
        let shutdown = self.shutdown();
        outcome.and(shutdown).map(|()| loops)
    }

    /// Free every motor, reporting the first failure after trying them all.
    pub fn shutdown(&mut self) -> Result<(), MotorError> {
        let mut first_err = None;
        for part in &mut self.parts {
            if let Err(e) = part.shutdown() {
                error!(part = part.name(), error = %e, "Motor shutdown failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
