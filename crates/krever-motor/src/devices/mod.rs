//! Motor driver devices.

pub mod l298n;
