//! Pin driver wirings and the motor controller built on them.

pub mod dual_pwm;
pub mod hbridge;
pub mod motor;
pub mod pwm_reference;
