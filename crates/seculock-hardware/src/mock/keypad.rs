//! Mock keypad implementation for testing and development.
//!
//! This module provides a simulated keypad that reports key presses sent
//! through a [`MockKeypadHandle`]. A scan with nothing queued reports no key,
//! just like an idle matrix.

use crate::{HardwareError, Result, traits::KeypadScanner};
use seculock_core::KeySymbol;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Event delivered to the mock keypad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadEvent {
    /// A key press.
    Press(KeySymbol),
    /// A scan failure, e.g. a pin fault.
    Fault(String),
}

/// Mock keypad device for testing and development.
///
/// # Examples
///
/// ```
/// use seculock_hardware::mock::MockKeypad;
/// use seculock_hardware::traits::KeypadScanner;
/// use seculock_core::KeySymbol;
///
/// #[tokio::main]
/// async fn main() -> seculock_hardware::Result<()> {
///     let (mut keypad, handle) = MockKeypad::new();
///
///     handle.type_keys("1#").await?;
///
///     assert_eq!(keypad.scan().await?, Some(KeySymbol::Digit(1)));
///     assert_eq!(keypad.scan().await?, Some(KeySymbol::Hash));
///     assert_eq!(keypad.scan().await?, None);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockKeypad {
    /// Channel receiver for simulated input
    input_rx: mpsc::Receiver<KeypadEvent>,
}

impl MockKeypad {
    /// Create a new mock keypad.
    ///
    /// Returns the keypad and the handle used to press its keys.
    pub fn new() -> (Self, MockKeypadHandle) {
        let (input_tx, input_rx) = mpsc::channel(64);
        (Self { input_rx }, MockKeypadHandle { input_tx })
    }
}

impl KeypadScanner for MockKeypad {
    async fn scan(&mut self) -> Result<Option<KeySymbol>> {
        match self.input_rx.try_recv() {
            Ok(KeypadEvent::Press(key)) => Ok(Some(key)),
            Ok(KeypadEvent::Fault(message)) => Err(HardwareError::bus(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(HardwareError::disconnected("Keypad input channel closed"))
            }
        }
    }
}

/// Handle for controlling a mock keypad.
///
/// This handle can be cloned and shared across tasks. Dropping every handle
/// disconnects the keypad.
#[derive(Debug, Clone)]
pub struct MockKeypadHandle {
    /// Channel sender for simulated input
    input_tx: mpsc::Sender<KeypadEvent>,
}

impl MockKeypadHandle {
    /// Send an event to the mock keypad.
    ///
    /// # Errors
    ///
    /// Returns an error if the keypad has been dropped and the channel is closed.
    pub async fn send(&self, event: KeypadEvent) -> Result<()> {
        self.input_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Keypad input channel closed"))
    }

    /// Press a single key.
    pub async fn press(&self, key: KeySymbol) -> Result<()> {
        self.send(KeypadEvent::Press(key)).await
    }

    /// Press the keys printed in `keys`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a character is not on the keypad or the keypad
    /// has been dropped.
    pub async fn type_keys(&self, keys: &str) -> Result<()> {
        for c in keys.chars() {
            let key = KeySymbol::from_char(c)
                .map_err(|e| HardwareError::unexpected_value(e.to_string()))?;
            self.press(key).await?;
        }
        Ok(())
    }

    /// Make the next scan fail.
    pub async fn fault(&self, message: impl Into<String>) -> Result<()> {
        self.send(KeypadEvent::Fault(message.into())).await
    }
}
