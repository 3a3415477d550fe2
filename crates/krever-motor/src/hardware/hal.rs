//! [`GpioBackend`] over `embedded-hal` 1.0 pins.
//!
//! Register each physical pin under the number the [`PinConfig`] refers to,
//! then hand the bank to the controller:
//!
//! ```ignore
//! let gpio = HalGpio::new()
//!     .with_output(17, in1)
//!     .with_output(27, in2)
//!     .with_pwm(22, ena);
//! ```
//!
//! All direction pins share one type `O` and all enable channels one type
//! `P`. HALs usually give every GPIO its own type, so erase them first:
//! either borrow the pins as `&mut dyn OutputPin<Error = E>` (embedded-hal
//! implements the traits for `&mut T`), or wrap them in an enum that
//! forwards `OutputPin` to the concrete pin.
//!
//! ```ignore
//! let gpio = HalGpio::<&mut dyn OutputPin<Error = Infallible>, _>::new()
//!     .with_output(17, &mut pa0)
//!     .with_output(27, &mut pb5)
//!     .with_pwm(22, &mut ena);
//! ```
//!
//! [`PinConfig`]: crate::config::PinConfig

use std::collections::BTreeMap;
use std::fmt::Debug;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::hardware::gpio::{GpioBackend, GpioError, Level, Pin};

#[derive(Debug)]
struct Output<O> {
    pin: O,
    configured: bool,
}

#[derive(Debug)]
struct Pwm<P> {
    channel: P,
    range: Option<u16>,
}

/// A bank of embedded-hal outputs addressed by pin number.
#[derive(Debug)]
pub struct HalGpio<O, P> {
    outputs: BTreeMap<Pin, Output<O>>,
    pwms: BTreeMap<Pin, Pwm<P>>,
}

impl<O, P> Default for HalGpio<O, P> {
    fn default() -> Self {
        Self {
            outputs: BTreeMap::new(),
            pwms: BTreeMap::new(),
        }
    }
}

impl<O, P> HalGpio<O, P>
where
    O: OutputPin,
    P: SetDutyCycle,
{
    /// An empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a digital output under `number`.
    pub fn with_output(mut self, number: Pin, pin: O) -> Self {
        self.outputs.insert(number, Output { pin, configured: false });
        self
    }

    /// Register a PWM channel under `number`.
    pub fn with_pwm(mut self, number: Pin, channel: P) -> Self {
        self.pwms.insert(number, Pwm { channel, range: None });
        self
    }

    /// The digital output registered under `number`.
    pub fn output(&self, number: Pin) -> Option<&O> {
        self.outputs.get(&number).map(|o| &o.pin)
    }

    /// The PWM channel registered under `number`.
    pub fn pwm(&self, number: Pin) -> Option<&P> {
        self.pwms.get(&number).map(|p| &p.channel)
    }
}

fn hardware(err: impl Debug) -> GpioError {
    GpioError::Hardware(format!("{err:?}"))
}

impl<O, P> GpioBackend for HalGpio<O, P>
where
    O: OutputPin,
    P: SetDutyCycle,
{
    fn configure_digital_output(&mut self, pin: Pin) -> Result<(), GpioError> {
        let output = self.outputs.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        output.pin.set_low().map_err(hardware)?;
        output.configured = true;
        Ok(())
    }

    fn write_digital(&mut self, pin: Pin, level: Level) -> Result<(), GpioError> {
        let output = self.outputs.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        if !output.configured {
            return Err(GpioError::NotConfigured(pin));
        }
        let written = match level {
            Level::High => output.pin.set_high(),
            Level::Low => output.pin.set_low(),
        };
        written.map_err(hardware)
    }

    fn configure_pwm_output(&mut self, pin: Pin, range: u32) -> Result<(), GpioError> {
        let pwm = self.pwms.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        // set_duty_cycle_fraction takes a u16 denominator
        let range = u16::try_from(range)
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| GpioError::Hardware(format!("unsupported pwm range {range}")))?;
        pwm.channel.set_duty_cycle_fully_off().map_err(hardware)?;
        pwm.range = Some(range);
        Ok(())
    }

    fn write_pwm_duty(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError> {
        let pwm = self.pwms.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        let range = pwm.range.ok_or(GpioError::NotConfigured(pin))?;
        if duty > u32::from(range) {
            return Err(GpioError::DutyOutOfRange {
                pin,
                duty,
                range: range.into(),
            });
        }
        pwm.channel
            .set_duty_cycle_fraction(duty as u16, range)
            .map_err(hardware)
    }

    fn release_pwm_output(&mut self, pin: Pin) -> Result<(), GpioError> {
        let pwm = self.pwms.get_mut(&pin).ok_or(GpioError::UnknownPin(pin))?;
        if pwm.range.take().is_none() {
            return Err(GpioError::NotConfigured(pin));
        }
        pwm.channel.set_duty_cycle_fully_off().map_err(hardware)
    }
}
