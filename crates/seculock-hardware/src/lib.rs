//! Hardware abstraction layer for the SecuLock locker controller.
//!
//! This crate provides trait-based abstractions for the peripherals on the
//! locker board, real drivers for them, and mocks that tests control
//! programmatically.
//!
//! # Device Traits
//!
//! - [`GpioChip`]: digital pins behind the relays, tamper sensors, keypad
//!   matrix and wake button.
//! - [`I2cBus`]: byte writes to the LCD backpack.
//! - [`CharacterDisplay`]: the two-line LCD.
//! - [`KeypadScanner`]: key presses from the 4x4 keypad.
//! - [`Camera`]: still frames for face verification.
//!
//! # Pin Ownership
//!
//! [`HardwareState`] claims all pins at startup and releases them when it is
//! dropped, driving both relays to their idle level first. Components get
//! cloneable [`OutputPin`]/[`InputPin`] handles from it.
//!
//! ```no_run
//! use seculock_hardware::{HardwareState, PinMap};
//! use seculock_hardware::devices::{AnyDisplay, AnyGpioChip};
//! use seculock_hardware::display::LogDisplay;
//! use seculock_hardware::sysfs::{SYSFS_GPIO_ROOT, SysfsGpio};
//!
//! # async fn example() -> seculock_hardware::Result<()> {
//! let chip = AnyGpioChip::Sysfs(SysfsGpio::new(SYSFS_GPIO_ROOT)?);
//! let display = AnyDisplay::Log(LogDisplay::new());
//! let hardware = HardwareState::acquire(chip, display, PinMap::default())?;
//!
//! hardware.display().show("Welcome", "").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`], which converts into `seculock_core::Error` at the
//! crate boundary.
//!
//! [`GpioChip`]: traits::GpioChip
//! [`I2cBus`]: traits::I2cBus
//! [`CharacterDisplay`]: traits::CharacterDisplay
//! [`KeypadScanner`]: traits::KeypadScanner
//! [`Camera`]: traits::Camera

pub mod camera;
pub mod devices;
pub mod display;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod lcd;
pub mod matrix;
pub mod mock;
pub mod state;
pub mod sysfs;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use display::SharedDisplay;
pub use error::{HardwareError, Result};
pub use gpio::{InputPin, OutputPin};
pub use state::{HardwareState, PinMap};
pub use traits::{Camera, CharacterDisplay, GpioChip, I2cBus, KeypadScanner};
pub use types::DeviceInfo;
