use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use krever_motor::{Direction, MoveProfile, PinConfig};
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const CONFIG_PATH_ENV: &str = "KREVER_CONFIG";

/// Everything the base binary reads from its configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pins: PinConfig,
    #[serde(default)]
    pub move_profile: MoveProfileConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// `move_motor` parameters as written in the file.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MoveProfileConfig {
    pub direction: Direction,
    pub speed: i32,
    pub duration_ms: u64,
}

impl Default for MoveProfileConfig {
    fn default() -> Self {
        let profile = MoveProfile::default();
        Self {
            direction: profile.direction,
            speed: profile.speed,
            duration_ms: profile.duration.as_millis() as u64,
        }
    }
}

impl From<MoveProfileConfig> for MoveProfile {
    fn from(cfg: MoveProfileConfig) -> Self {
        MoveProfile {
            direction: cfg.direction,
            speed: cfg.speed,
            duration: Duration::from_millis(cfg.duration_ms),
        }
    }
}

/// Raw motor identifiers to move, in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub motors: Vec<i32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { motors: vec![0, 1] }
    }
}

/// Load the configuration from `$KREVER_CONFIG` (or `config/default.toml`),
/// with `KREVER__SECTION__KEY` environment overrides on top.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!("Attempting to load configuration from {}", path);

    let builder = Config::builder()
        .add_source(File::new(&path, FileFormat::Toml).required(false))
        .add_source(Environment::with_prefix("KREVER").prefix_separator("__").separator("__"));
    build(builder)
}

/// Parse a TOML document, without environment overrides.
pub fn parse_config(toml: &str) -> Result<AppConfig, ConfigError> {
    build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    let settings = builder.build().and_then(|c| c.try_deserialize::<AppConfig>());

    match settings {
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

#[cfg(test)]
mod tests {
    use super::*;
    use krever_motor::MotorPins;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.pins, PinConfig::default());
        assert_eq!(MoveProfile::from(config.move_profile), MoveProfile::default());
        assert_eq!(config.run.motors, vec![0, 1]);
    }

    #[test]
    fn test_full_document() {
        let config = parse_config(
            r#"
            [pins]
            pwm_range = 255
            [pins.left]
            dir_a = 5
            dir_b = 6
            enable = 12

            [move_profile]
            direction = "backward"
            speed = 80
            duration_ms = 250

            [run]
            motors = [0]
            "#,
        )
        .unwrap();

        assert_eq!(config.pins.left, Some(MotorPins::new(5, 6, 12)));
        assert_eq!(config.pins.right, None);
        assert_eq!(config.pins.pwm_range, 255);

        let profile = MoveProfile::from(config.move_profile);
        assert_eq!(profile.direction, Direction::Backward);
        assert_eq!(profile.speed, 80);
        assert_eq!(profile.duration, Duration::from_millis(250));
        assert_eq!(config.run.motors, vec![0]);
    }

    #[test]
    fn test_pwm_range_defaults_when_omitted() {
        let config = parse_config(
            r#"
            [pins.right]
            dir_a = 23
            dir_b = 24
            enable = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.pins.pwm_range, 100);
        assert_eq!(config.pins.left, None);
    }

    #[test]
    fn test_rejects_malformed_pin() {
        let result = parse_config(
            r#"
            [pins.left]
            dir_a = "seventeen"
            dir_b = 27
            enable = 22
            "#,
        );
        assert!(result.is_err());
    }
}
