//! Pin wiring of the driver board.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MotorError;
use crate::hardware::gpio::Pin;
use crate::traits::motor::Motor;

/// Default PWM range of the enable pins; duty equals speed percent.
pub const DEFAULT_PWM_RANGE: u32 = 100;

/// The three host pins wired to one H-bridge channel.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorPins {
    /// IN1 / IN3.
    pub dir_a: Pin,
    /// IN2 / IN4.
    pub dir_b: Pin,
    /// ENA / ENB, driven with PWM.
    pub enable: Pin,
}

impl MotorPins {
    /// Construct a pin triple.
    pub const fn new(dir_a: Pin, dir_b: Pin, enable: Pin) -> Self {
        Self { dir_a, dir_b, enable }
    }
}

/// Which pins each motor is wired to, and the PWM range of the enable pins.
///
/// A motor left as `None` is not connected; commands addressed to it fail
/// with [`MotorError::InvalidMotorIdentifier`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    /// Channel A.
    pub left: Option<MotorPins>,
    /// Channel B.
    pub right: Option<MotorPins>,
    /// Maximum duty of the enable pins.
    #[cfg_attr(feature = "serde", serde(default = "default_pwm_range"))]
    pub pwm_range: u32,
}

#[cfg(feature = "serde")]
fn default_pwm_range() -> u32 {
    DEFAULT_PWM_RANGE
}

impl Default for PinConfig {
    /// The stock krever wiring (BCM numbering).
    fn default() -> Self {
        Self {
            left: Some(MotorPins::new(17, 27, 22)),
            right: Some(MotorPins::new(23, 24, 25)),
            pwm_range: DEFAULT_PWM_RANGE,
        }
    }
}

impl PinConfig {
    /// Pins of `motor`, if it is connected.
    pub fn pins(&self, motor: Motor) -> Option<MotorPins> {
        match motor {
            Motor::Left => self.left,
            Motor::Right => self.right,
        }
    }

    /// Connected motors with their pins.
    pub fn motors(&self) -> impl Iterator<Item = (Motor, MotorPins)> + '_ {
        Motor::ALL
            .into_iter()
            .filter_map(|motor| self.pins(motor).map(|pins| (motor, pins)))
    }

    /// Check the configuration can be driven safely.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidConfig)` if the PWM range is zero, no
    /// motor is connected, or one pin is assigned to two roles.
    pub fn validate(&self) -> Result<(), MotorError> {
        if self.pwm_range == 0 {
            return Err(MotorError::InvalidConfig("pwm range must be positive"));
        }

        let mut used: Vec<Pin> = self
            .motors()
            .flat_map(|(_, p)| [p.dir_a, p.dir_b, p.enable])
            .collect();
        if used.is_empty() {
            return Err(MotorError::InvalidConfig("no motor pins configured"));
        }

        let total = used.len();
        used.sort_unstable();
        used.dedup();
        if used.len() != total {
            return Err(MotorError::InvalidConfig("pin assigned to more than one role"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wiring() {
        let config = PinConfig::default();
        assert_eq!(config.pins(Motor::Left), Some(MotorPins::new(17, 27, 22)));
        assert_eq!(config.pins(Motor::Right), Some(MotorPins::new(23, 24, 25)));
        assert_eq!(config.pwm_range, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_single_motor_is_valid() {
        let config = PinConfig {
            right: None,
            ..PinConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.motors().count(), 1);
    }

    #[test]
    fn test_rejects_zero_range() {
        let config = PinConfig {
            pwm_range: 0,
            ..PinConfig::default()
        };
        assert!(matches!(config.validate(), Err(MotorError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_shared_pin() {
        let config = PinConfig {
            right: Some(MotorPins::new(23, 24, 22)),
            ..PinConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(MotorError::InvalidConfig("pin assigned to more than one role"))
        );

        let same_channel = PinConfig {
            left: Some(MotorPins::new(17, 17, 22)),
            right: None,
            ..PinConfig::default()
        };
        assert!(same_channel.validate().is_err());
    }

    #[test]
    fn test_rejects_no_motors() {
        let config = PinConfig {
            left: None,
            right: None,
            ..PinConfig::default()
        };
        assert_eq!(config.validate(), Err(MotorError::InvalidConfig("no motor pins configured")));
    }
}
