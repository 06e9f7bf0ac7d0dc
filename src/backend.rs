use std::time::Duration;

use dcmotor::{GpioController, GpioError, Level, MockGpio, PigpioClient, Pin, PinMode};
use tracing::info;

use crate::settings::{GpioBackend, GpioConfig};

/// GPIO controller chosen at startup from `[gpio] backend`.
#[derive(Debug)]
pub enum Backend {
    Mock(MockGpio),
    Pigpio(PigpioClient),
}

impl Backend {
    pub fn open(cfg: &GpioConfig) -> Result<Self, GpioError> {
        match cfg.backend {
            GpioBackend::Mock => {
                info!("Using in-memory GPIO backend");
                Ok(Backend::Mock(MockGpio::new()))
            }
            GpioBackend::Pigpio => {
                let timeout = Duration::from_millis(cfg.timeout_ms);
                let client = PigpioClient::connect(&cfg.host, cfg.port, timeout)?;
                info!(peer = client.peer(), "Using pigpio GPIO backend");
                Ok(Backend::Pigpio(client))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Mock(_) => "mock",
            Backend::Pigpio(_) => "pigpio",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $io:ident => $call:expr) => {
        match $self {
            Backend::Mock($io) => $call,
            Backend::Pigpio($io) => $call,
        }
    };
}

impl GpioController for Backend {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), GpioError> {
        delegate!(self, io => io.set_mode(pin, mode))
    }

    fn set_pwm_frequency(&mut self, pin: Pin, hz: u32) -> Result<(), GpioError> {
        delegate!(self, io => io.set_pwm_frequency(pin, hz))
    }

    fn set_pwm_range(&mut self, pin: Pin, range: u32) -> Result<(), GpioError> {
        delegate!(self, io => io.set_pwm_range(pin, range))
    }

    fn write(&mut self, pin: Pin, level: Level) -> Result<(), GpioError> {
        delegate!(self, io => io.write(pin, level))
    }

    fn set_pwm_duty_cycle(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError> {
        delegate!(self, io => io.set_pwm_duty_cycle(pin, duty))
    }
}
