//! Driver-facing traits and the values they exchange.

pub mod driver;
