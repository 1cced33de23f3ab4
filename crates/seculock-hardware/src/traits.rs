//! Hardware device trait definitions.
//!
//! This module defines the contract between the locker controller and its
//! peripherals: the GPIO chip behind the relays, sensors and keypad matrix,
//! the I2C bus behind the character LCD, the LCD itself, the keypad scanner
//! and the camera. Each trait has a real driver and a mock, selected at
//! runtime through the enums in [`devices`](crate::devices).
//!
//! Device operations that wait on the outside world use native `async fn`
//! methods (Rust 1.90 + Edition 2024 RPITIT). Pin and bus writes complete in
//! microseconds and are plain synchronous calls.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::DeviceInfo;
use image::RgbImage;
use seculock_core::{DisplayLine, KeySymbol, PinLevel, Pull};

/// A bank of digital GPIO lines.
///
/// Pins are claimed once, in one direction, and released when no longer
/// needed. Reading or writing a pin that was not claimed in the matching
/// direction is an error.
///
/// # Object Safety and Dynamic Dispatch
///
/// Implementations are selected at runtime through
/// [`AnyGpioChip`](crate::devices::AnyGpioChip) rather than `Box<dyn GpioChip>`,
/// matching the other device traits of this crate.
pub trait GpioChip: Send {
    /// Claim `pin` as an output and drive it to `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PinAlreadyClaimed`](crate::HardwareError::PinAlreadyClaimed)
    /// if the pin is already owned, or an I/O error from the backend.
    fn claim_output(&mut self, pin: u32, initial: PinLevel) -> Result<()>;

    /// Claim `pin` as an input with the given bias.
    ///
    /// # Errors
    ///
    /// Same as [`claim_output`](Self::claim_output).
    fn claim_input(&mut self, pin: u32, pull: Pull) -> Result<()>;

    /// Drive a claimed output.
    fn write(&mut self, pin: u32, level: PinLevel) -> Result<()>;

    /// Sample a claimed input.
    fn read(&mut self, pin: u32) -> Result<PinLevel>;

    /// Give the pin back to the system.
    fn release(&mut self, pin: u32) -> Result<()>;

    /// Describe the chip for startup logging.
    fn info(&self) -> DeviceInfo;
}

/// Byte-oriented I2C bus used by the LCD backpack.
pub trait I2cBus: Send {
    /// Write a single byte to the device at `address`.
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<()>;
}

/// Two-line character display.
///
/// Callers hand in text that has already been fitted to the display width;
/// see [`fit_line`](crate::display::fit_line).
pub trait CharacterDisplay: Send + Sync {
    /// Replace one line of the display.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus write fails.
    async fn write_line(&mut self, line: DisplayLine, text: &str) -> Result<()>;

    /// Blank both lines.
    async fn clear(&mut self) -> Result<()>;
}

/// Source of key presses.
///
/// # Examples
///
/// ```no_run
/// use seculock_hardware::traits::KeypadScanner;
/// use seculock_hardware::error::Result;
///
/// async fn read_digits<K: KeypadScanner>(keypad: &mut K) -> Result<String> {
///     let mut code = String::new();
///
///     loop {
///         match keypad.scan().await? {
///             Some(key) if key.is_submit() => break,
///             Some(key) if key.is_digit() => code.push(key.as_char()),
///             _ => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
///         }
///     }
///
///     Ok(code)
/// }
/// ```
pub trait KeypadScanner: Send + Sync {
    /// Scan the keypad once.
    ///
    /// Returns `Ok(None)` when no new key is pressed. A key that stays held
    /// is reported once.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin cannot be driven or sampled.
    async fn scan(&mut self) -> Result<Option<KeySymbol>>;
}

/// Still camera.
pub trait Camera: Send + Sync {
    /// Capture one RGB frame.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Capture`](crate::HardwareError::Capture)
    /// when no frame could be produced.
    async fn capture(&mut self) -> Result<RgbImage>;

    /// Get device information.
    async fn get_info(&self) -> Result<DeviceInfo>;
}
