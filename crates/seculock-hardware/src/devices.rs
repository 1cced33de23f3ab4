//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits (RPITIT, Rust Edition 2024) is not
//! object-safe, so devices chosen at runtime from the configuration are
//! wrapped in enums instead of `Box<dyn Trait>`. Each wrapper implements the
//! device trait by matching on its variant.
//!
//! # Examples
//!
//! ```
//! use seculock_hardware::devices::AnyKeypad;
//! use seculock_hardware::mock::MockKeypad;
//! use seculock_hardware::traits::KeypadScanner;
//!
//! #[tokio::main]
//! async fn main() -> seculock_hardware::Result<()> {
//!     let (keypad, _handle) = MockKeypad::new();
//!     let mut keypad = AnyKeypad::Mock(keypad);
//!
//!     assert_eq!(keypad.scan().await?, None);
//!     Ok(())
//! }
//! ```

use crate::camera::CommandCamera;
use crate::display::LogDisplay;
use crate::i2c::I2cDevBus;
use crate::lcd::Lcd1602;
use crate::matrix::MatrixKeypad;
use crate::mock::{MockCamera, MockDisplay, MockGpio, MockKeypad};
use crate::sysfs::SysfsGpio;
use crate::traits::{Camera, CharacterDisplay, GpioChip, KeypadScanner};
use crate::{DeviceInfo, Result};
use image::RgbImage;
use seculock_core::{DisplayLine, KeySymbol, PinLevel, Pull};

/// Enum wrapper for GPIO chip dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyGpioChip {
    /// Linux sysfs GPIO.
    Sysfs(SysfsGpio),
    /// In-memory chip for development and testing.
    Mock(MockGpio),
}

impl GpioChip for AnyGpioChip {
    fn claim_output(&mut self, pin: u32, initial: PinLevel) -> Result<()> {
        match self {
            Self::Sysfs(chip) => chip.claim_output(pin, initial),
            Self::Mock(chip) => chip.claim_output(pin, initial),
        }
    }

    fn claim_input(&mut self, pin: u32, pull: Pull) -> Result<()> {
        match self {
            Self::Sysfs(chip) => chip.claim_input(pin, pull),
            Self::Mock(chip) => chip.claim_input(pin, pull),
        }
    }

    fn write(&mut self, pin: u32, level: PinLevel) -> Result<()> {
        match self {
            Self::Sysfs(chip) => chip.write(pin, level),
            Self::Mock(chip) => chip.write(pin, level),
        }
    }

    fn read(&mut self, pin: u32) -> Result<PinLevel> {
        match self {
            Self::Sysfs(chip) => chip.read(pin),
            Self::Mock(chip) => chip.read(pin),
        }
    }

    fn release(&mut self, pin: u32) -> Result<()> {
        match self {
            Self::Sysfs(chip) => chip.release(pin),
            Self::Mock(chip) => chip.release(pin),
        }
    }

    fn info(&self) -> DeviceInfo {
        match self {
            Self::Sysfs(chip) => chip.info(),
            Self::Mock(chip) => chip.info(),
        }
    }
}

/// Enum wrapper for character display dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDisplay {
    /// 16x2 LCD on an i2c-dev bus.
    Lcd(Lcd1602<I2cDevBus>),
    /// Lines written to the log.
    Log(LogDisplay),
    /// Recording display for development and testing.
    Mock(MockDisplay),
}

impl CharacterDisplay for AnyDisplay {
    async fn write_line(&mut self, line: DisplayLine, text: &str) -> Result<()> {
        match self {
            Self::Lcd(display) => display.write_line(line, text).await,
            Self::Log(display) => display.write_line(line, text).await,
            Self::Mock(display) => display.write_line(line, text).await,
        }
    }

    async fn clear(&mut self) -> Result<()> {
        match self {
            Self::Lcd(display) => display.clear().await,
            Self::Log(display) => display.clear().await,
            Self::Mock(display) => display.clear().await,
        }
    }
}

/// Enum wrapper for keypad dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyKeypad {
    /// GPIO matrix keypad.
    Matrix(MatrixKeypad<AnyGpioChip>),
    /// Mock keypad for development and testing.
    Mock(MockKeypad),
}

impl KeypadScanner for AnyKeypad {
    async fn scan(&mut self) -> Result<Option<KeySymbol>> {
        match self {
            Self::Matrix(keypad) => keypad.scan().await,
            Self::Mock(keypad) => keypad.scan().await,
        }
    }
}

/// Enum wrapper for camera dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCamera {
    /// External still-capture command.
    Command(CommandCamera),
    /// Mock camera for development and testing.
    Mock(MockCamera),
}

impl Camera for AnyCamera {
    async fn capture(&mut self) -> Result<RgbImage> {
        match self {
            Self::Command(camera) => camera.capture().await,
            Self::Mock(camera) => camera.capture().await,
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Command(camera) => camera.get_info().await,
            Self::Mock(camera) => camera.get_info().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::solid_frame;

    #[tokio::test]
    async fn test_any_gpio_chip_mock() {
        let (chip, handle) = MockGpio::new();
        let mut chip = AnyGpioChip::Mock(chip);

        chip.claim_output(26, PinLevel::High).unwrap();
        chip.write(26, PinLevel::Low).unwrap();

        assert_eq!(handle.output_level(26), Some(PinLevel::Low));
        assert_eq!(chip.info().name, "MockGpio");
    }

    #[tokio::test]
    async fn test_any_display_mock() {
        let (display, handle) = MockDisplay::new();
        let mut display = AnyDisplay::Mock(display);

        display.write_line(DisplayLine::Top, "Welcome").await.unwrap();
        assert_eq!(handle.lines()[0], "Welcome");
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_display_lcd_reports_missing_bus() {
        let dir = tempfile::tempdir().unwrap();
        let bus = I2cDevBus::with_path(dir.path().join("i2c-1"));
        let mut display = AnyDisplay::Lcd(Lcd1602::new(bus, 0x27));

        let error = display.write_line(DisplayLine::Top, "Welcome").await.unwrap_err();
        assert!(matches!(error, crate::HardwareError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_any_camera_mock() {
        let (camera, handle) = MockCamera::new();
        let mut camera = AnyCamera::Mock(camera);
        handle.queue_frame(solid_frame(2, 2, [0, 0, 0])).await.unwrap();

        assert_eq!(camera.capture().await.unwrap().dimensions(), (2, 2));
        assert_eq!(camera.get_info().await.unwrap().name, "MockCamera");
    }
}
