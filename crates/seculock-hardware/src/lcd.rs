//! HD44780 16x2 LCD behind a PCF8574 I2C backpack.
//!
//! The backpack exposes the controller's data bus four bits at a time. Each
//! byte is sent as two nibbles; each nibble is latched by pulsing the
//! enable bit. The backlight bit is kept set on every write.
//!
//! ```text
//! PCF8574 bit:  7  6  5  4  3   2   1   0
//! signal:       D7 D6 D5 D4 BL  EN  RW  RS
//! ```

use crate::display::fit_line;
use crate::error::Result;
use crate::traits::{CharacterDisplay, I2cBus};
use seculock_core::DisplayLine;
use std::time::Duration;
use tracing::debug;

/// Register select: character data.
const LCD_CHR: u8 = 1;
/// Register select: command.
const LCD_CMD: u8 = 0;

const LCD_BACKLIGHT: u8 = 0x08;
const ENABLE: u8 = 0b0000_0100;

/// DDRAM address of each line.
const LINE_ADDRESS: [u8; 2] = [0x80, 0xC0];

const CMD_CLEAR: u8 = 0x01;

/// Reset into 4-bit mode, two lines, display on, cursor off, left-to-right,
/// cleared.
const INIT_SEQUENCE: [u8; 6] = [0x33, 0x32, 0x28, 0x0C, 0x06, CMD_CLEAR];

const POWER_UP_DELAY: Duration = Duration::from_millis(50);
const CLEAR_DELAY: Duration = Duration::from_millis(2);

/// Character LCD driver.
///
/// The controller is initialised lazily on the first write, so constructing
/// the driver never touches the bus.
#[derive(Debug)]
pub struct Lcd1602<B: I2cBus> {
    bus: B,
    address: u8,
    initialized: bool,
}

impl<B: I2cBus> Lcd1602<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            initialized: false,
        }
    }

    /// Run the 4-bit initialisation sequence.
    pub async fn init(&mut self) -> Result<()> {
        tokio::time::sleep(POWER_UP_DELAY).await;
        for command in INIT_SEQUENCE {
            self.write_byte(command, LCD_CMD)?;
        }
        tokio::time::sleep(CLEAR_DELAY).await;
        self.initialized = true;
        debug!(address = self.address, "LCD initialized");
        Ok(())
    }

    async fn ensure_initialized(&mut self) -> Result<()> {
        if !self.initialized {
            self.init().await?;
        }
        Ok(())
    }

    fn write_byte(&mut self, bits: u8, mode: u8) -> Result<()> {
        let high = mode | (bits & 0xF0) | LCD_BACKLIGHT;
        let low = mode | ((bits << 4) & 0xF0) | LCD_BACKLIGHT;
        self.write_nibble(high)?;
        self.write_nibble(low)
    }

    // A single I2C transaction outlasts the 450ns enable pulse width, so the
    // strobe needs no explicit delay.
    fn write_nibble(&mut self, nibble: u8) -> Result<()> {
        self.bus.write_byte(self.address, nibble)?;
        self.bus.write_byte(self.address, nibble | ENABLE)?;
        self.bus.write_byte(self.address, nibble & !ENABLE)
    }
}

impl<B: I2cBus + Sync> CharacterDisplay for Lcd1602<B> {
    async fn write_line(&mut self, line: DisplayLine, text: &str) -> Result<()> {
        self.ensure_initialized().await?;
        self.write_byte(LINE_ADDRESS[line.index()], LCD_CMD)?;
        for byte in fit_line(text).bytes() {
            self.write_byte(byte, LCD_CHR)?;
        }
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.ensure_initialized().await?;
        self.write_byte(CMD_CLEAR, LCD_CMD)?;
        tokio::time::sleep(CLEAR_DELAY).await;
        Ok(())
    }
}
