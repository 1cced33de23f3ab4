//! 4x4 matrix keypad scanned over GPIO.
//!
//! Rows idle high. A scan pulls one row low at a time and samples the
//! pulled-up columns; a column reading low means the key at that
//! intersection is pressed. Every row is driven high again before the scan
//! moves on, including when a sample fails.

use crate::error::{HardwareError, Result};
use crate::gpio::{InputPin, OutputPin};
use crate::traits::{GpioChip, KeypadScanner};
use seculock_core::constants::KEYPAD_DEBOUNCE;
use seculock_core::{KeySymbol, PinLevel};
use std::time::Duration;
use tracing::trace;

/// Matrix keypad driver.
///
/// Reports each press once: a key that is still held on the next scan is
/// not reported again until it has been released.
#[derive(Debug)]
pub struct MatrixKeypad<G: GpioChip> {
    rows: Vec<OutputPin<G>>,
    cols: Vec<InputPin<G>>,
    debounce: Duration,
    held: Option<KeySymbol>,
}

impl<G: GpioChip> MatrixKeypad<G> {
    /// Build a scanner over claimed row outputs and column inputs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless there are four rows and four
    /// columns.
    pub fn new(rows: Vec<OutputPin<G>>, cols: Vec<InputPin<G>>) -> Result<Self> {
        if rows.len() != 4 || cols.len() != 4 {
            return Err(HardwareError::pin_map(format!(
                "keypad needs 4 rows and 4 columns, got {} and {}",
                rows.len(),
                cols.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            debounce: KEYPAD_DEBOUNCE,
            held: None,
        })
    }

    /// Override the settle time after a detected press.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn pressed_column(&self) -> Result<Option<usize>> {
        for (c, col) in self.cols.iter().enumerate() {
            if col.read()? == PinLevel::Low {
                return Ok(Some(c));
            }
        }
        Ok(None)
    }

    fn scan_matrix(&self) -> Result<Option<KeySymbol>> {
        for (r, row) in self.rows.iter().enumerate() {
            row.set(PinLevel::Low)?;
            let hit = self.pressed_column();
            row.set(PinLevel::High)?;
            if let Some(c) = hit? {
                return Ok(KeySymbol::at(r, c));
            }
        }
        Ok(None)
    }
}

impl<G: GpioChip> KeypadScanner for MatrixKeypad<G> {
    async fn scan(&mut self) -> Result<Option<KeySymbol>> {
        match self.scan_matrix()? {
            Some(key) if self.held == Some(key) => Ok(None),
            Some(key) => {
                trace!(%key, "key pressed");
                self.held = Some(key);
                tokio::time::sleep(self.debounce).await;
                Ok(Some(key))
            }
            None => {
                self.held = None;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockGpio, MockGpioHandle};
    use seculock_core::Pull;
    use seculock_core::constants::{KEYPAD_COL_PINS, KEYPAD_ROW_PINS};
    use std::sync::{Arc, Mutex};

    fn keypad() -> (MatrixKeypad<MockGpio>, MockGpioHandle) {
        let (mut chip, handle) = MockGpio::new();
        for pin in KEYPAD_ROW_PINS {
            chip.claim_output(pin, PinLevel::High).unwrap();
        }
        for pin in KEYPAD_COL_PINS {
            chip.claim_input(pin, Pull::Up).unwrap();
        }
        let chip = Arc::new(Mutex::new(chip));
        let rows = KEYPAD_ROW_PINS
            .iter()
            .map(|p| OutputPin::new(Arc::clone(&chip), *p))
            .collect();
        let cols = KEYPAD_COL_PINS
            .iter()
            .map(|p| InputPin::new(Arc::clone(&chip), *p))
            .collect();
        (MatrixKeypad::new(rows, cols).unwrap(), handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_keypad_reports_nothing() {
        let (mut keypad, handle) = keypad();
        assert_eq!(keypad.scan().await.unwrap(), None);
        for pin in KEYPAD_ROW_PINS {
            assert_eq!(handle.output_level(pin), Some(PinLevel::High));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_maps_to_layout() {
        let (mut keypad, handle) = keypad();
        // row 3, column 2 is '#'
        handle.hold_key(KEYPAD_ROW_PINS[3], KEYPAD_COL_PINS[2]);

        assert_eq!(keypad.scan().await.unwrap(), Some(KeySymbol::Hash));
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_key_reported_once() {
        let (mut keypad, handle) = keypad();
        handle.hold_key(KEYPAD_ROW_PINS[0], KEYPAD_COL_PINS[0]);

        assert_eq!(keypad.scan().await.unwrap(), Some(KeySymbol::Digit(1)));
        assert_eq!(keypad.scan().await.unwrap(), None);

        handle.release_key(KEYPAD_ROW_PINS[0], KEYPAD_COL_PINS[0]);
        assert_eq!(keypad.scan().await.unwrap(), None);

        handle.hold_key(KEYPAD_ROW_PINS[0], KEYPAD_COL_PINS[0]);
        assert_eq!(keypad.scan().await.unwrap(), Some(KeySymbol::Digit(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_waits_for_debounce() {
        let (mut keypad, handle) = keypad();
        handle.hold_key(KEYPAD_ROW_PINS[1], KEYPAD_COL_PINS[1]);

        let start = tokio::time::Instant::now();
        assert_eq!(keypad.scan().await.unwrap(), Some(KeySymbol::Digit(5)));
        assert!(start.elapsed() >= KEYPAD_DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_restored_high_when_column_read_fails() {
        let (mut keypad, handle) = keypad();
        handle.fail_pin(KEYPAD_COL_PINS[0]);

        assert!(keypad.scan().await.is_err());
        assert_eq!(handle.output_level(KEYPAD_ROW_PINS[0]), Some(PinLevel::High));
        assert_eq!(
            handle.writes(KEYPAD_ROW_PINS[0]),
            vec![PinLevel::High, PinLevel::Low, PinLevel::High]
        );
    }

    #[test]
    fn test_wrong_matrix_size_rejected() {
        let (chip, _handle) = MockGpio::new();
        let chip = Arc::new(Mutex::new(chip));
        let rows = vec![OutputPin::new(Arc::clone(&chip), 17)];
        assert!(MatrixKeypad::new(rows, Vec::new()).is_err());
    }
}
