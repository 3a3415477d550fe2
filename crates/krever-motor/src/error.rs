//! Error types for the motor driver.

use thiserror::Error;

use crate::hardware::gpio::GpioError;

/// Errors that can occur while driving the motors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotorError {
    /// The GPIO subsystem could not configure the driver pins.
    /// Returned by `init`; the controller is unusable afterwards.
    #[error("failed to initialize motor driver pins: {0}")]
    InitializationFailure(#[source] GpioError),
    /// The identifier does not name a motor the controller has pins for.
    /// No pin is written when this is returned.
    #[error("invalid motor identifier {0}")]
    InvalidMotorIdentifier(i64),
    /// A raw direction value other than 0 (backward) or 1 (forward).
    #[error("invalid direction value {0}")]
    InvalidDirection(u8),
    /// A command was issued before `init` or after `shutdown`.
    #[error("motor driver is not initialized")]
    NotInitialized,
    /// The pin configuration was rejected at construction.
    #[error("invalid pin configuration: {0}")]
    InvalidConfig(&'static str),
    /// A pin write failed after initialization.
    #[error("gpio write failed: {0}")]
    Gpio(#[from] GpioError),
}
