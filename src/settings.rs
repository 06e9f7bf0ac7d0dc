use std::collections::BTreeMap;

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState};
use dcmotor::PinAssignment;
use serde::Deserialize;
use tracing::{error, info};

use crate::blackboard::Value;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "DCMOTOR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub vehicle: VehicleConfig,
    pub gpio: GpioConfig,
    pub motors: MotorsConfig,
    /// Memory entries set before the first cycle.
    pub inputs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub drive_loop_hz: u32,
    /// `0` runs until interrupted.
    pub max_loops: u64,
    /// Stop the loop on the first motor error instead of skipping the cycle.
    pub halt_on_fault: bool,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        VehicleConfig {
            drive_loop_hz: 20,
            max_loops: 100_000,
            halt_on_fault: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackend {
    #[default]
    Mock,
    Pigpio,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: GpioBackend,
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for GpioConfig {
    fn default() -> Self {
        GpioConfig {
            backend: GpioBackend::Mock,
            host: "localhost".to_string(),
            port: dcmotor::hardware::pigpio::DEFAULT_PORT,
            timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorsConfig {
    pub left: MotorConfig,
    pub right: MotorConfig,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        MotorsConfig {
            left: MotorConfig::for_side("left", 38, 40),
            right: MotorConfig::for_side("right", 35, 37),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    pub pins: PinAssignment,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    pub value_key: String,
    pub status_key: String,
}

impl MotorConfig {
    fn for_side(side: &str, in1: u32, in2: u32) -> Self {
        MotorConfig {
            pins: PinAssignment::new(in1, in2),
            epsilon: default_epsilon(),
            value_key: format!("user/{side}/value"),
            status_key: format!("user/{side}/status"),
        }
    }
}

fn default_epsilon() -> f64 {
    dcmotor::DEFAULT_EPSILON
}

/// Load `path` with `DCMOTOR__SECTION__KEY` environment overrides on top.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let builder = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(true));

    match finish(builder) {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_config(toml: &str) -> Result<AppConfig, ConfigError> {
        finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.vehicle.drive_loop_hz, 20);
        assert_eq!(cfg.vehicle.max_loops, 100_000);
        assert_eq!(cfg.gpio.backend, GpioBackend::Mock);
        assert_eq!(cfg.gpio.port, 8888);
        assert_eq!(cfg.motors.left.pins, PinAssignment::new(38, 40));
        assert_eq!(cfg.motors.right.status_key, "user/right/status");
        assert_eq!(cfg.motors.right.epsilon, 0.1);
        assert!(cfg.inputs.is_empty());
    }

    #[test]
    fn test_motor_tables() {
        let cfg = parse_config(
            r#"
            [gpio]
            backend = "pigpio"
            host = "raspberrypi.local"

            [motors.left]
            epsilon = 0.05
            value_key = "pilot/left"
            status_key = "pilot/left_status"

            [motors.left.pins]
            in1 = 20
            in2 = 21
            vref = 18
            pwm_range = 100
            "#,
        )
        .unwrap();

        assert_eq!(cfg.gpio.backend, GpioBackend::Pigpio);
        assert_eq!(cfg.gpio.host, "raspberrypi.local");
        let left = &cfg.motors.left;
        assert_eq!(left.pins.vref, Some(18));
        assert_eq!(left.pins.pwm_range, 100);
        assert_eq!(left.pins.pwm_freq, 50);
        assert_eq!(left.epsilon, 0.05);
        assert_eq!(left.value_key, "pilot/left");
        // The untouched side keeps its defaults.
        assert_eq!(cfg.motors.right.pins.in1, 35);
    }

    #[test]
    fn test_inputs_table() {
        let cfg = parse_config(
            r#"
            [inputs]
            "user/left/value" = 0.5
            "user/left/status" = "brake"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.inputs.get("user/left/value"), Some(&Value::Float(0.5)));
        assert_eq!(cfg.inputs.get("user/left/status"), Some(&Value::Text("brake".into())));
    }

    #[test]
    fn test_pins_table_needs_both_inputs() {
        let result = parse_config(
            r#"
            [motors.left]
            value_key = "user/left/value"
            status_key = "user/left/status"

            [motors.left.pins]
            in1 = 20
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pins_table_fills_pwm_defaults() {
        let cfg = parse_config(
            r#"
            [motors.right]
            value_key = "user/right/value"
            status_key = "user/right/status"

            [motors.right.pins]
            in1 = 5
            in2 = 6
            "#,
        )
        .unwrap();
        assert_eq!(cfg.motors.right.pins, PinAssignment::new(5, 6));
    }

    #[test]
    fn test_unknown_backend_is_error() {
        assert!(parse_config("[gpio]\nbackend = \"sysfs\"").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_config("does/not/exist.toml").is_err());
    }
}
