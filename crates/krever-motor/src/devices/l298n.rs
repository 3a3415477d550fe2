//! L298N dual H-bridge controller.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{MotorPins, PinConfig};
use crate::error::MotorError;
use crate::hardware::gpio::{GpioBackend, Level};
use crate::traits::motor::{Direction, Motor, MotorControl, MotorState};

/// Highest speed a command can request; higher values are clamped.
pub const MAX_SPEED: i32 = 100;

struct Inner<B> {
    backend: B,
    initialized: bool,
    states: [MotorState; 2],
}

/// Controller for both channels of an L298N dual H-bridge.
///
/// Each connected motor is driven through a pin triple: two direction
/// inputs and a PWM enable input. All state lives behind one lock, so the
/// controller can be shared between threads (e.g. a control loop and a
/// safety-stop handler) when the backend is `Send`.
///
/// Stopping coasts the motor: the enable duty drops to zero and the
/// direction inputs keep their levels. [`brake`](Self::brake) is the only
/// operation that drives both direction inputs to the same level.
pub struct MotorController<B: GpioBackend> {
    config: PinConfig,
    inner: Mutex<Inner<B>>,
}

impl<B: GpioBackend> MotorController<B> {
    /// Create a controller for the given wiring. No pin is touched until
    /// [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InvalidConfig)` if `config` fails
    /// [`PinConfig::validate`].
    pub fn new(config: PinConfig, backend: B) -> Result<Self, MotorError> {
        config.validate()?;
        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                backend,
                initialized: false,
                states: Motor::ALL.map(MotorState::idle),
            }),
        })
    }

    /// The wiring this controller drives.
    pub fn config(&self) -> &PinConfig {
        &self.config
    }

    /// Whether [`init`](Self::init) has completed and no
    /// [`shutdown`](Self::shutdown) happened since.
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Configure the direction pins as digital outputs (low) and the enable
    /// pins as PWM outputs (duty 0).
    ///
    /// Calling `init` on an initialized controller does nothing, so the pins
    /// are never reconfigured while motors are running.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::InitializationFailure)` if the backend cannot
    /// configure a pin. The controller stays uninitialized.
    pub fn init(&self) -> Result<(), MotorError> {
        let mut inner = self.inner.lock();
        if inner.initialized {
            debug!("motor driver already initialized");
            return Ok(());
        }

        for (motor, pins) in self.config.motors() {
            let backend = &mut inner.backend;
            backend
                .configure_digital_output(pins.dir_a)
                .and_then(|()| backend.configure_digital_output(pins.dir_b))
                .and_then(|()| backend.configure_pwm_output(pins.enable, self.config.pwm_range))
                .map_err(MotorError::InitializationFailure)?;
            debug!(%motor, ?pins, "motor channel configured");
        }

        inner.states = Motor::ALL.map(MotorState::idle);
        inner.initialized = true;
        debug!(pwm_range = self.config.pwm_range, "motor driver initialized");
        Ok(())
    }

    /// Brake `motor` by driving both direction inputs low with the enable
    /// input fully on. The recorded direction is kept; the next
    /// [`run`](MotorControl::run) releases the brake.
    pub fn brake(&self, motor: Motor) -> Result<(), MotorError> {
        let pins = self.pins(motor)?;
        let mut inner = self.initialized()?;
        let range = self.config.pwm_range;

        inner.backend.write_digital(pins.dir_a, Level::Low)?;
        inner.backend.write_digital(pins.dir_b, Level::Low)?;
        inner.backend.write_pwm_duty(pins.enable, range)?;

        let state = &mut inner.states[motor.index()];
        state.speed = 0;
        state.duty = range;
        state.braking = true;
        debug!(%motor, "brake");
        Ok(())
    }

    /// What was last commanded for `motor`.
    pub fn state(&self, motor: Motor) -> Result<MotorState, MotorError> {
        self.pins(motor)?;
        Ok(self.inner.lock().states[motor.index()])
    }

    /// Coast every connected motor.
    ///
    /// Every motor is attempted even if an earlier one fails; the first
    /// failure is returned.
    pub fn stop_all(&self) -> Result<(), MotorError> {
        let mut inner = self.initialized()?;
        let mut result = Ok(());
        for (motor, pins) in self.config.motors() {
            let stopped = Self::coast(&mut inner, motor, pins);
            if result.is_ok() {
                result = stopped;
            }
        }
        debug!("all motors stopped");
        result
    }

    /// Stop every motor, drive all direction pins low and release the PWM
    /// channels. The controller must be [`init`](Self::init)ed again before
    /// further commands. Does nothing if the controller is not initialized.
    ///
    /// Every pin is attempted even if an earlier one fails; the first
    /// failure is returned.
    pub fn shutdown(&self) -> Result<(), MotorError> {
        Self::release(&self.config, &mut self.inner.lock())
    }

    fn release(config: &PinConfig, inner: &mut Inner<B>) -> Result<(), MotorError> {
        if !inner.initialized {
            return Ok(());
        }

        let mut result = Ok(());
        for (motor, pins) in config.motors() {
            let backend = &mut inner.backend;
            let released = backend
                .write_pwm_duty(pins.enable, 0)
                .and_then(|()| backend.write_digital(pins.dir_a, Level::Low))
                .and_then(|()| backend.write_digital(pins.dir_b, Level::Low))
                .and_then(|()| backend.release_pwm_output(pins.enable))
                .map_err(MotorError::from);
            if let Err(err) = &released {
                warn!(%motor, %err, "failed to release motor channel");
            }
            if result.is_ok() {
                result = released;
            }
        }

        inner.initialized = false;
        inner.states = Motor::ALL.map(MotorState::idle);
        debug!("motor driver shut down");
        result
    }

    fn pins(&self, motor: Motor) -> Result<MotorPins, MotorError> {
        self.config
            .pins(motor)
            .ok_or(MotorError::InvalidMotorIdentifier(motor.id().into()))
    }

    fn initialized(&self) -> Result<parking_lot::MutexGuard<'_, Inner<B>>, MotorError> {
        let inner = self.inner.lock();
        if !inner.initialized {
            return Err(MotorError::NotInitialized);
        }
        Ok(inner)
    }

    fn coast(inner: &mut Inner<B>, motor: Motor, pins: MotorPins) -> Result<(), MotorError> {
        inner.backend.write_pwm_duty(pins.enable, 0)?;
        let state = &mut inner.states[motor.index()];
        state.speed = 0;
        state.duty = 0;
        state.braking = false;
        Ok(())
    }
}

impl<B: GpioBackend> MotorControl for MotorController<B> {
    type Error = MotorError;

    fn run(&self, motor: Motor, direction: Direction, speed: i32) -> Result<(), MotorError> {
        let pins = self.pins(motor)?;
        let speed = clamp_speed(speed);
        let mut inner = self.initialized()?;

        // Cut the enable before the direction pair changes under a powered
        // motor, so a failed duty write below leaves it coasting.
        let current = inner.states[motor.index()];
        if current.duty > 0 && (current.direction != direction || current.braking) {
            Self::coast(&mut inner, motor, pins)?;
        }

        // Lower the outgoing input first so the pair never reads high/high.
        let (high, low) = match direction {
            Direction::Forward => (pins.dir_a, pins.dir_b),
            Direction::Backward => (pins.dir_b, pins.dir_a),
        };
        inner.backend.write_digital(low, Level::Low)?;
        inner.backend.write_digital(high, Level::High)?;
        let state = &mut inner.states[motor.index()];
        state.direction = direction;
        state.braking = false;

        let duty = speed_to_duty(speed, self.config.pwm_range);
        inner.backend.write_pwm_duty(pins.enable, duty)?;

        let state = &mut inner.states[motor.index()];
        state.speed = speed;
        state.duty = duty;
        debug!(%motor, %direction, speed, duty, "run");
        Ok(())
    }

    fn stop(&self, motor: Motor) -> Result<(), MotorError> {
        let pins = self.pins(motor)?;
        let mut inner = self.initialized()?;
        Self::coast(&mut inner, motor, pins)?;
        debug!(%motor, "stop");
        Ok(())
    }

    fn direction(&self, motor: Motor) -> Result<Direction, MotorError> {
        self.pins(motor)?;
        Ok(self.inner.lock().states[motor.index()].direction)
    }
}

impl<B: GpioBackend> Drop for MotorController<B> {
    fn drop(&mut self) {
        if let Err(err) = Self::release(&self.config, self.inner.get_mut()) {
            warn!(%err, "motor driver did not shut down cleanly");
        }
    }
}

impl<B: GpioBackend> core::fmt::Debug for MotorController<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MotorController")
            .field("config", &self.config)
            .field("initialized", &inner.initialized)
            .field("states", &inner.states)
            .finish_non_exhaustive()
    }
}

/// Clamp a requested speed into `0..=MAX_SPEED`.
pub fn clamp_speed(speed: i32) -> u8 {
    let clamped = speed.clamp(0, MAX_SPEED);
    if clamped != speed {
        warn!(requested = speed, applied = clamped, "speed out of range, clamped");
    }
    clamped as u8
}

/// Convert a speed percentage to a duty in `0..=range`.
pub fn speed_to_duty(speed: u8, range: u32) -> u32 {
    (u64::from(speed) * u64::from(range) / MAX_SPEED as u64) as u32
}
