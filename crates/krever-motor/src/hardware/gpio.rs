//! The GPIO/PWM access layer the motor controller drives.
//!
//! The controller never touches hardware directly. Everything goes through a
//! [`GpioBackend`], which lets the same controller run against real HAL pins
//! or against the [`SimulatedGpio`](crate::hardware::sim::SimulatedGpio)
//! used in tests.

use core::fmt;

use thiserror::Error;

/// GPIO pin number, as printed on the host's header (BCM numbering on a Pi).
pub type Pin = u8;

/// Logic level of a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Pulled to ground.
    Low,
    /// Driven to the supply rail.
    High,
}

impl Level {
    /// Returns `true` if the level is [`Level::High`].
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// Errors reported by a GPIO backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpioError {
    /// The backend has no pin with this number.
    #[error("unknown pin {0}")]
    UnknownPin(Pin),
    /// The pin exists but was not configured for the requested mode.
    #[error("pin {0} is not configured for this operation")]
    NotConfigured(Pin),
    /// The requested duty exceeds the range the pin was configured with.
    #[error("duty {duty} is outside the configured range 0..={range} of pin {pin}")]
    DutyOutOfRange {
        /// Pin the write was addressed to.
        pin: Pin,
        /// Requested duty.
        duty: u32,
        /// Configured PWM range.
        range: u32,
    },
    /// The underlying hardware layer reported a failure.
    #[error("hardware failure: {0}")]
    Hardware(String),
}

/// The four primitives the motor controller needs from the host.
///
/// Implementations are expected to complete every call synchronously.
pub trait GpioBackend {
    /// Configure `pin` as a push-pull digital output.
    fn configure_digital_output(&mut self, pin: Pin) -> Result<(), GpioError>;

    /// Drive a configured digital output to `level`.
    fn write_digital(&mut self, pin: Pin, level: Level) -> Result<(), GpioError>;

    /// Configure `pin` as a PWM output accepting duties in `0..=range`.
    fn configure_pwm_output(&mut self, pin: Pin, range: u32) -> Result<(), GpioError>;

    /// Set the duty of a configured PWM output.
    fn write_pwm_duty(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError>;

    /// Release a PWM channel. Backends without a notion of releasing a
    /// channel keep the default, which does nothing.
    fn release_pwm_output(&mut self, _pin: Pin) -> Result<(), GpioError> {
        Ok(())
    }
}

impl<B: GpioBackend + ?Sized> GpioBackend for Box<B> {
    fn configure_digital_output(&mut self, pin: Pin) -> Result<(), GpioError> {
        (**self).configure_digital_output(pin)
    }

    fn write_digital(&mut self, pin: Pin, level: Level) -> Result<(), GpioError> {
        (**self).write_digital(pin, level)
    }

    fn configure_pwm_output(&mut self, pin: Pin, range: u32) -> Result<(), GpioError> {
        (**self).configure_pwm_output(pin, range)
    }

    fn write_pwm_duty(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError> {
        (**self).write_pwm_duty(pin, duty)
    }

    fn release_pwm_output(&mut self, pin: Pin) -> Result<(), GpioError> {
        (**self).release_pwm_output(pin)
    }
}
