//! In-memory controller for tests and dry runs without hardware.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::hardware::gpio::{GpioController, GpioError, GpioReadback, Level, Pin, PinMode};

/// Error code the mock reports for injected faults (`PI_NOT_PERMITTED`).
const INJECTED_FAULT: i32 = -41;

/// One write issued to the mock, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioOp {
    /// `set_mode(pin, mode)`
    Mode(Pin, PinMode),
    /// `set_pwm_frequency(pin, hz)`
    Frequency(Pin, u32),
    /// `set_pwm_range(pin, range)`
    Range(Pin, u32),
    /// `write(pin, level)`
    Write(Pin, Level),
    /// `set_pwm_duty_cycle(pin, duty)`
    DutyCycle(Pin, u32),
}

#[derive(Debug, Clone, Default)]
struct PinRecord {
    mode: Option<PinMode>,
    frequency: Option<u32>,
    range: Option<u32>,
    duty_cycle: Option<u32>,
    level: Option<Level>,
}

/// Controller that keeps pin state in memory and journals every write.
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    pins: BTreeMap<Pin, PinRecord>,
    history: Vec<GpioOp>,
    reject_config: BTreeSet<Pin>,
    fail_writes: BTreeSet<Pin>,
}

impl MockGpio {
    /// Empty controller: no pin configured, no faults injected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject mode, frequency and range settings on `pin`, as a controller does
    /// for a pin it cannot hand out.
    pub fn reject_config(&mut self, pin: Pin) -> &mut Self {
        self.reject_config.insert(pin);
        self
    }

    /// Fail level and duty-cycle writes on `pin`.
    pub fn fail_writes(&mut self, pin: Pin) -> &mut Self {
        self.fail_writes.insert(pin);
        self
    }

    /// Remove all injected faults.
    pub fn clear_faults(&mut self) {
        self.reject_config.clear();
        self.fail_writes.clear();
    }

    /// Every successful write so far, oldest first.
    pub fn history(&self) -> &[GpioOp] {
        &self.history
    }

    /// Forget the journal, keeping pin state.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Last duty cycle written to `pin`, if any.
    pub fn duty_cycle_of(&self, pin: Pin) -> Option<u32> {
        self.pins.get(&pin).and_then(|p| p.duty_cycle)
    }

    /// Last level written to `pin`, if any.
    pub fn level_of(&self, pin: Pin) -> Option<Level> {
        self.pins.get(&pin).and_then(|p| p.level)
    }

    fn check_config(&self, op: &'static str, pin: Pin) -> Result<(), GpioError> {
        if self.reject_config.contains(&pin) {
            return Err(GpioError::Rejected { op, pin, code: INJECTED_FAULT });
        }
        Ok(())
    }

    fn check_write(&self, op: &'static str, pin: Pin) -> Result<(), GpioError> {
        if self.fail_writes.contains(&pin) {
            return Err(GpioError::Rejected { op, pin, code: INJECTED_FAULT });
        }
        Ok(())
    }

    fn record(&mut self, op: GpioOp) {
        trace!(?op, "mock gpio write");
        self.history.push(op);
    }

    fn configured<T>(
        &self,
        pin: Pin,
        what: &'static str,
        get: impl FnOnce(&PinRecord) -> Option<T>,
    ) -> Result<T, GpioError> {
        self.pins
            .get(&pin)
            .and_then(get)
            .ok_or(GpioError::NotConfigured { pin, what })
    }
}

impl GpioController for MockGpio {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), GpioError> {
        self.check_config("set_mode", pin)?;
        self.pins.entry(pin).or_default().mode = Some(mode);
        self.record(GpioOp::Mode(pin, mode));
        Ok(())
    }

    fn set_pwm_frequency(&mut self, pin: Pin, hz: u32) -> Result<(), GpioError> {
        self.check_config("set_PWM_frequency", pin)?;
        self.pins.entry(pin).or_default().frequency = Some(hz);
        self.record(GpioOp::Frequency(pin, hz));
        Ok(())
    }

    fn set_pwm_range(&mut self, pin: Pin, range: u32) -> Result<(), GpioError> {
        self.check_config("set_PWM_range", pin)?;
        self.pins.entry(pin).or_default().range = Some(range);
        self.record(GpioOp::Range(pin, range));
        Ok(())
    }

    fn write(&mut self, pin: Pin, level: Level) -> Result<(), GpioError> {
        self.check_write("write", pin)?;
        self.pins.entry(pin).or_default().level = Some(level);
        self.record(GpioOp::Write(pin, level));
        Ok(())
    }

    fn set_pwm_duty_cycle(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError> {
        self.check_write("set_PWM_dutycycle", pin)?;
        self.pins.entry(pin).or_default().duty_cycle = Some(duty);
        self.record(GpioOp::DutyCycle(pin, duty));
        Ok(())
    }
}

impl GpioReadback for MockGpio {
    fn mode(&mut self, pin: Pin) -> Result<PinMode, GpioError> {
        self.configured(pin, "mode", |p| p.mode)
    }

    fn pwm_frequency(&mut self, pin: Pin) -> Result<u32, GpioError> {
        self.configured(pin, "PWM frequency", |p| p.frequency)
    }

    fn pwm_range(&mut self, pin: Pin) -> Result<u32, GpioError> {
        self.configured(pin, "PWM range", |p| p.range)
    }

    fn pwm_duty_cycle(&mut self, pin: Pin) -> Result<u32, GpioError> {
        self.configured(pin, "PWM duty cycle", |p| p.duty_cycle)
    }

    fn read(&mut self, pin: Pin) -> Result<Level, GpioError> {
        self.configured(pin, "level", |p| p.level)
    }
}
