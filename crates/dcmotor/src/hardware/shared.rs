//! Process-wide controller handle shared by every motor.
//!
//! One [`SharedGpio`] wraps the single controller connection. Drivers clone it,
//! claim their pins through it, and run each action's write sequence under its
//! lock so another thread never observes a half-written motor.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::MotorError;
use crate::hardware::gpio::Pin;

struct Shared<G> {
    controller: G,
    claimed: BTreeSet<Pin>,
}

/// Cloneable handle to one GPIO controller plus the set of pins claimed on it.
pub struct SharedGpio<G> {
    inner: Arc<Mutex<Shared<G>>>,
}

impl<G> Clone for SharedGpio<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G> SharedGpio<G> {
    /// Wrap a controller. Whoever calls this owns the connection's teardown.
    pub fn new(controller: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared {
                controller,
                claimed: BTreeSet::new(),
            })),
        }
    }

    /// Run `f` with exclusive access to the controller.
    ///
    /// Everything written inside `f` is one uninterrupted sequence with respect
    /// to other users of this handle.
    pub fn lock_sequence<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard.controller)
    }

    /// Claim `pins` for one driver.
    ///
    /// # Errors
    ///
    /// Returns `Err(MotorError::PinConflict)` naming the first pin that is
    /// already held by a live claim or is listed twice.
    pub fn claim(&self, pins: &[Pin]) -> Result<PinClaim<G>, MotorError> {
        let mut guard = self.inner.lock();
        let mut requested = BTreeSet::new();
        for &pin in pins {
            if guard.claimed.contains(&pin) || !requested.insert(pin) {
                return Err(MotorError::PinConflict(pin));
            }
        }
        guard.claimed.extend(requested.iter().copied());

        Ok(PinClaim {
            gpio: self.clone(),
            pins: requested.into_iter().collect(),
        })
    }

    /// Whether a live driver holds `pin`.
    pub fn is_claimed(&self, pin: Pin) -> bool {
        self.inner.lock().claimed.contains(&pin)
    }

    /// All claimed pins in ascending order.
    pub fn claimed_pins(&self) -> Vec<Pin> {
        self.inner.lock().claimed.iter().copied().collect()
    }

    /// Take the controller back once this is the last handle.
    ///
    /// Returns the handle unchanged while drivers still hold clones.
    pub fn into_inner(self) -> Result<G, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().controller),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<G> fmt::Debug for SharedGpio<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGpio")
            .field("claimed", &self.claimed_pins())
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// Pins held by one driver. Dropping the claim releases them.
pub struct PinClaim<G> {
    gpio: SharedGpio<G>,
    pins: Vec<Pin>,
}

impl<G> PinClaim<G> {
    /// Handle the pins were claimed on.
    pub fn gpio(&self) -> &SharedGpio<G> {
        &self.gpio
    }

    /// Claimed pins in ascending order.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }
}

impl<G> Drop for PinClaim<G> {
    fn drop(&mut self) {
        let mut guard = self.gpio.inner.lock();
        for pin in &self.pins {
            guard.claimed.remove(pin);
        }
    }
}

impl<G> fmt::Debug for PinClaim<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinClaim").field("pins", &self.pins).finish()
    }
}
