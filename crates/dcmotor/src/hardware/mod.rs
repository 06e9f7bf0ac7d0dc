//! Controller side: the GPIO surface, the shared handle, and the two backends.

pub mod gpio;
pub mod mock;
pub mod pigpio;
pub mod shared;
