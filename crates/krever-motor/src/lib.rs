#![warn(missing_docs)]
#![doc = "Driver for L298N-class dual H-bridge DC motor controllers."]
#![doc = ""]
#![doc = "A [`MotorController`] maps `(motor, direction, speed)` commands onto the two"]
#![doc = "direction inputs and the PWM enable input of each H-bridge channel, through"]
#![doc = "any [`GpioBackend`]. It remembers the last direction commanded for each motor."]

pub mod config;
pub mod devices;
pub mod error;
pub mod hardware;
pub mod traits;

pub use config::{MotorPins, PinConfig};
pub use devices::l298n::MotorController;
pub use error::MotorError;
pub use hardware::gpio::{GpioBackend, GpioError, Level, Pin};
pub use hardware::hal::HalGpio;
pub use hardware::sim::SimulatedGpio;
pub use traits::motor::{Direction, Motor, MotorControl, MotorState, MoveProfile};
