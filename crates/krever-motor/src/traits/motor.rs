//! Motor identifiers, directions and the `MotorControl` trait.

use core::fmt;
use core::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MotorError;

/// One of the two channels of the dual H-bridge.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Motor {
    /// Channel A (IN1/IN2/ENA), raw identifier 0.
    Left,
    /// Channel B (IN3/IN4/ENB), raw identifier 1.
    Right,
}

impl Motor {
    /// Both motors, in identifier order.
    pub const ALL: [Motor; 2] = [Motor::Left, Motor::Right];

    /// Raw identifier of the motor.
    pub const fn id(self) -> u8 {
        match self {
            Motor::Left => 0,
            Motor::Right => 1,
        }
    }

    pub(crate) const fn index(self) -> usize {
        self.id() as usize
    }
}

impl TryFrom<i64> for Motor {
    type Error = MotorError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Motor::Left),
            1 => Ok(Motor::Right),
            other => Err(MotorError::InvalidMotorIdentifier(other)),
        }
    }
}

impl TryFrom<i32> for Motor {
    type Error = MotorError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Motor::try_from(i64::from(id))
    }
}

impl TryFrom<u8> for Motor {
    type Error = MotorError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Motor::try_from(i64::from(id))
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Motor::Left => write!(f, "left"),
            Motor::Right => write!(f, "right"),
        }
    }
}

/// Rotation direction of a motor.
///
/// The pin polarity is fixed by the wiring: `Forward` drives
/// `(dir_a, dir_b)` to `(high, low)`, `Backward` to `(low, high)`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    /// Reverse rotation.
    Backward = 0,
    /// Forward rotation. Every motor starts out in this state.
    #[default]
    Forward = 1,
}

impl Direction {
    /// The opposite direction.
    pub const fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        direction as u8
    }
}

impl TryFrom<u8> for Direction {
    type Error = MotorError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Direction::Backward),
            1 => Ok(Direction::Forward),
            other => Err(MotorError::InvalidDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// Snapshot of what the controller last commanded for one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    /// Motor the snapshot describes.
    pub motor: Motor,
    /// Last commanded direction.
    pub direction: Direction,
    /// Commanded speed after clamping, 0 to 100.
    pub speed: u8,
    /// Duty last written to the enable pin, in PWM range units.
    pub duty: u32,
    /// Whether the motor is held in a brake.
    pub braking: bool,
}

impl MotorState {
    /// A stopped motor facing forward.
    pub const fn idle(motor: Motor) -> Self {
        Self {
            motor,
            direction: Direction::Forward,
            speed: 0,
            duty: 0,
            braking: false,
        }
    }

    /// Whether the enable pin is currently driving the motor.
    pub fn is_running(&self) -> bool {
        self.speed > 0 && !self.braking
    }
}

/// How `move_motor` drives a motor: which way, how fast and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveProfile {
    /// Direction to run in.
    pub direction: Direction,
    /// Speed, clamped to 0..=100 like any other command.
    pub speed: i32,
    /// How long the motor runs before it is stopped.
    pub duration: Duration,
}

impl Default for MoveProfile {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            speed: 50,
            duration: Duration::from_secs(1),
        }
    }
}

/// Core trait defining the interface for motor control
pub trait MotorControl {
    /// Error returned by the operations.
    type Error: From<MotorError> + fmt::Display;

    /// Run `motor` in `direction` at `speed` (clamped to 0..=100).
    fn run(&self, motor: Motor, direction: Direction, speed: i32) -> Result<(), Self::Error>;

    /// Stop `motor`, keeping its recorded direction.
    fn stop(&self, motor: Motor) -> Result<(), Self::Error>;

    /// Last direction commanded for `motor`.
    fn direction(&self, motor: Motor) -> Result<Direction, Self::Error>;

    /// Run the motor with raw identifier `motor_id` for `profile.duration`,
    /// then stop it.
    ///
    /// Blocks the calling thread for the duration of the move. Returns
    /// `false` and logs the cause if any step fails.
    fn move_motor(&self, motor_id: i32, profile: &MoveProfile) -> bool {
        let result = Motor::try_from(motor_id)
            .map_err(Self::Error::from)
            .and_then(|motor| {
                self.run(motor, profile.direction, profile.speed)?;
                spin_sleep::sleep(profile.duration);
                self.stop(motor)
            });

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(motor_id, %err, "move_motor failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_from_raw_identifier() {
        assert_eq!(Motor::try_from(0u8), Ok(Motor::Left));
        assert_eq!(Motor::try_from(1i32), Ok(Motor::Right));
        assert_eq!(Motor::try_from(2u8), Err(MotorError::InvalidMotorIdentifier(2)));
        assert_eq!(Motor::try_from(-1i32), Err(MotorError::InvalidMotorIdentifier(-1)));
    }

    #[test]
    fn test_motor_ids_round_trip() {
        for motor in Motor::ALL {
            assert_eq!(Motor::try_from(motor.id()), Ok(motor));
        }
    }

    #[test]
    fn test_direction_raw_values() {
        // BACKWARD = 0, FORWARD = 1
        assert_eq!(u8::from(Direction::Backward), 0);
        assert_eq!(u8::from(Direction::Forward), 1);
        assert_eq!(Direction::default(), Direction::Forward);
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);

        assert_eq!(Direction::try_from(0u8), Ok(Direction::Backward));
        assert_eq!(Direction::try_from(1u8), Ok(Direction::Forward));
        assert_eq!(Direction::try_from(2u8), Err(MotorError::InvalidDirection(2)));
        for direction in [Direction::Backward, Direction::Forward] {
            assert_eq!(Direction::try_from(u8::from(direction)), Ok(direction));
        }
    }

    #[test]
    fn test_braking_motor_is_not_running() {
        let mut state = MotorState::idle(Motor::Left);
        assert!(!state.is_running());
        state.speed = 40;
        assert!(state.is_running());
        state.braking = true;
        assert!(!state.is_running());
    }
}
