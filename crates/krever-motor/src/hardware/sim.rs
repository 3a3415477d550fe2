//! In-memory GPIO backend.
//!
//! `SimulatedGpio` keeps the level, duty and mode of every pin it has been
//! asked to configure, plus an ordered log of writes. Clones share the same
//! state, so a test can hand one clone to the controller and inspect the
//! pins through another.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::hardware::gpio::{GpioBackend, GpioError, Level, Pin};

/// Mode a simulated pin is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Digital push-pull output.
    Output,
    /// PWM output with the given range.
    Pwm {
        /// Maximum duty accepted by the pin.
        range: u32,
    },
    /// PWM channel that has been released.
    Released,
}

/// One recorded write, in the order the backend received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    /// `write_digital(pin, level)`.
    Digital(Pin, Level),
    /// `write_pwm_duty(pin, duty)`.
    Duty(Pin, u32),
}

#[derive(Debug, Clone, Copy)]
struct PinState {
    mode: PinMode,
    level: Level,
    duty: u32,
}

#[derive(Debug, Default)]
struct SimState {
    pins: BTreeMap<Pin, PinState>,
    writes: Vec<PinWrite>,
    configurations: usize,
    unavailable: bool,
    duty_budget: Option<usize>,
}

/// Shared handle to a simulated GPIO bank.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGpio {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedGpio {
    /// A fresh bank with every pin unconfigured.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bank whose configuration calls all fail, as if the GPIO subsystem
    /// could not be opened.
    pub fn unavailable() -> Self {
        let sim = Self::new();
        sim.state.lock().unavailable = true;
        sim
    }

    /// Current mode of `pin`, `None` if it was never configured.
    pub fn mode(&self, pin: Pin) -> Option<PinMode> {
        self.state.lock().pins.get(&pin).map(|p| p.mode)
    }

    /// Current level of a digital output.
    pub fn level(&self, pin: Pin) -> Option<Level> {
        self.state
            .lock()
            .pins
            .get(&pin)
            .filter(|p| p.mode == PinMode::Output)
            .map(|p| p.level)
    }

    /// Current duty of a PWM output (0 once released).
    pub fn duty(&self, pin: Pin) -> Option<u32> {
        self.state
            .lock()
            .pins
            .get(&pin)
            .filter(|p| p.mode != PinMode::Output)
            .map(|p| p.duty)
    }

    /// Every write received so far.
    pub fn writes(&self) -> Vec<PinWrite> {
        self.state.lock().writes.clone()
    }

    /// Let the next `writes` duty writes through, then fail every later one
    /// with a hardware error. `None` lifts the limit.
    pub fn fail_duty_writes_after(&self, writes: Option<usize>) {
        self.state.lock().duty_budget = writes;
    }

    /// Number of successful `configure_*` calls.
    pub fn configuration_count(&self) -> usize {
        self.state.lock().configurations
    }

    /// Forget the write log, keeping pin state.
    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    fn check_available(state: &SimState) -> Result<(), GpioError> {
        if state.unavailable {
            return Err(GpioError::Hardware("gpio subsystem unavailable".into()));
        }
        Ok(())
    }
}

impl GpioBackend for SimulatedGpio {
    fn configure_digital_output(&mut self, pin: Pin) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        Self::check_available(&state)?;
        trace!(pin, "configure digital output");
        state.configurations += 1;
        state.pins.insert(
            pin,
            PinState {
                mode: PinMode::Output,
                level: Level::Low,
                duty: 0,
            },
        );
        Ok(())
    }

    fn write_digital(&mut self, pin: Pin, level: Level) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        let entry = state.pins.get_mut(&pin).ok_or(GpioError::NotConfigured(pin))?;
        if entry.mode != PinMode::Output {
            return Err(GpioError::NotConfigured(pin));
        }
        entry.level = level;
        state.writes.push(PinWrite::Digital(pin, level));
        trace!(pin, %level, "digital write");
        Ok(())
    }

    fn configure_pwm_output(&mut self, pin: Pin, range: u32) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        Self::check_available(&state)?;
        trace!(pin, range, "configure pwm output");
        state.configurations += 1;
        state.pins.insert(
            pin,
            PinState {
                mode: PinMode::Pwm { range },
                level: Level::Low,
                duty: 0,
            },
        );
        Ok(())
    }

    fn write_pwm_duty(&mut self, pin: Pin, duty: u32) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        if let Some(budget) = state.duty_budget.as_mut() {
            if *budget == 0 {
                return Err(GpioError::Hardware("pwm write failed".into()));
            }
            *budget -= 1;
        }
        let entry = state.pins.get_mut(&pin).ok_or(GpioError::NotConfigured(pin))?;
        let PinMode::Pwm { range } = entry.mode else {
            return Err(GpioError::NotConfigured(pin));
        };
        if duty > range {
            return Err(GpioError::DutyOutOfRange { pin, duty, range });
        }
        entry.duty = duty;
        state.writes.push(PinWrite::Duty(pin, duty));
        trace!(pin, duty, "pwm write");
        Ok(())
    }

    fn release_pwm_output(&mut self, pin: Pin) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        let entry = state.pins.get_mut(&pin).ok_or(GpioError::NotConfigured(pin))?;
        if !matches!(entry.mode, PinMode::Pwm { .. }) {
            return Err(GpioError::NotConfigured(pin));
        }
        entry.mode = PinMode::Released;
        entry.duty = 0;
        trace!(pin, "release pwm output");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let sim = SimulatedGpio::new();
        let mut backend = sim.clone();
        backend.configure_digital_output(17).unwrap();
        backend.write_digital(17, Level::High).unwrap();

        assert_eq!(sim.level(17), Some(Level::High));
        assert_eq!(sim.writes(), vec![PinWrite::Digital(17, Level::High)]);
    }

    #[test]
    fn test_write_requires_matching_mode() {
        let mut sim = SimulatedGpio::new();
        assert_eq!(sim.write_digital(4, Level::High), Err(GpioError::NotConfigured(4)));

        sim.configure_pwm_output(4, 100).unwrap();
        assert_eq!(sim.write_digital(4, Level::High), Err(GpioError::NotConfigured(4)));

        sim.configure_digital_output(5).unwrap();
        assert_eq!(sim.write_pwm_duty(5, 10), Err(GpioError::NotConfigured(5)));
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_duty_bounded_by_range() {
        let mut sim = SimulatedGpio::new();
        sim.configure_pwm_output(22, 100).unwrap();
        sim.write_pwm_duty(22, 100).unwrap();
        assert_eq!(
            sim.write_pwm_duty(22, 101),
            Err(GpioError::DutyOutOfRange { pin: 22, duty: 101, range: 100 })
        );
        assert_eq!(sim.duty(22), Some(100));
    }

    #[test]
    fn test_release_zeroes_duty() {
        let mut sim = SimulatedGpio::new();
        sim.configure_pwm_output(25, 100).unwrap();
        sim.write_pwm_duty(25, 60).unwrap();
        sim.release_pwm_output(25).unwrap();

        assert_eq!(sim.mode(25), Some(PinMode::Released));
        assert_eq!(sim.duty(25), Some(0));
        assert_eq!(sim.write_pwm_duty(25, 10), Err(GpioError::NotConfigured(25)));
    }

    #[test]
    fn test_duty_writes_fail_once_budget_is_spent() {
        let mut sim = SimulatedGpio::new();
        sim.configure_pwm_output(22, 100).unwrap();
        sim.fail_duty_writes_after(Some(1));

        sim.write_pwm_duty(22, 30).unwrap();
        assert!(matches!(sim.write_pwm_duty(22, 40), Err(GpioError::Hardware(_))));
        assert_eq!(sim.duty(22), Some(30));

        sim.fail_duty_writes_after(None);
        sim.write_pwm_duty(22, 40).unwrap();
        assert_eq!(sim.duty(22), Some(40));
    }

    #[test]
    fn test_unavailable_rejects_configuration() {
        let mut sim = SimulatedGpio::unavailable();
        assert!(matches!(sim.configure_digital_output(17), Err(GpioError::Hardware(_))));
        assert!(matches!(sim.configure_pwm_output(22, 100), Err(GpioError::Hardware(_))));
        assert_eq!(sim.mode(17), None);
    }
}
