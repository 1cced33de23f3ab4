//! Claimed pin handles.
//!
//! Handles share the chip through `Arc<Mutex<_>>` so that the keypad
//! scanner, the authenticator and the intrusion monitor can each drive their
//! own pins while [`HardwareState`](crate::state::HardwareState) keeps
//! ownership of the chip for release on shutdown. The mutex is a std mutex:
//! pin access never awaits, and the drop guard must be able to lock it
//! outside a runtime.

use crate::error::{HardwareError, Result};
use crate::traits::GpioChip;
use seculock_core::PinLevel;
use std::sync::{Arc, Mutex, MutexGuard};

/// GPIO chip shared between pin handles.
pub type SharedGpio<G> = Arc<Mutex<G>>;

pub(crate) fn lock_chip<G>(chip: &Mutex<G>) -> Result<MutexGuard<'_, G>> {
    chip.lock().map_err(|_| HardwareError::Poisoned("GPIO chip"))
}

/// Handle to a claimed output pin.
#[derive(Debug)]
pub struct OutputPin<G: GpioChip> {
    chip: SharedGpio<G>,
    pin: u32,
}

impl<G: GpioChip> OutputPin<G> {
    pub(crate) fn new(chip: SharedGpio<G>, pin: u32) -> Self {
        Self { chip, pin }
    }

    /// BCM number of the pin.
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Drive the pin to `level`.
    pub fn set(&self, level: PinLevel) -> Result<()> {
        lock_chip(&self.chip)?.write(self.pin, level)
    }

    /// Energise an active-low relay.
    pub fn activate(&self) -> Result<()> {
        self.set(PinLevel::ASSERTED)
    }

    /// De-energise an active-low relay.
    pub fn deactivate(&self) -> Result<()> {
        self.set(PinLevel::RELEASED)
    }
}

impl<G: GpioChip> Clone for OutputPin<G> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.chip), self.pin)
    }
}

/// Handle to a claimed input pin.
#[derive(Debug)]
pub struct InputPin<G: GpioChip> {
    chip: SharedGpio<G>,
    pin: u32,
}

impl<G: GpioChip> InputPin<G> {
    pub(crate) fn new(chip: SharedGpio<G>, pin: u32) -> Self {
        Self { chip, pin }
    }

    /// BCM number of the pin.
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Sample the pin.
    pub fn read(&self) -> Result<PinLevel> {
        lock_chip(&self.chip)?.read(self.pin)
    }

    /// True when an active-low input is pulled low.
    pub fn is_active(&self) -> Result<bool> {
        Ok(self.read()?.is_asserted())
    }
}

impl<G: GpioChip> Clone for InputPin<G> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.chip), self.pin)
    }
}
