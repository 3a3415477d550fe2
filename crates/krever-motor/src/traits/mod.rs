//! Traits and shared types for motor drivers.

pub mod motor;
