//! GPIO/PWM backends.

pub mod gpio;
pub mod hal;
pub mod sim;
