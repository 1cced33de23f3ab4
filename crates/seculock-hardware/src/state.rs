//! Scoped ownership of the board's pins and display.
//!
//! [`HardwareState`] claims every pin of the [`PinMap`] when it is acquired
//! and hands out cheap handles to the components that drive them. Releasing
//! it (explicitly or by dropping it) de-energises both relays and gives
//! every pin back, on every exit path including a panic.
//!
//! # Examples
//!
//! ```
//! use seculock_hardware::mock::{MockDisplay, MockGpio};
//! use seculock_hardware::state::{HardwareState, PinMap};
//! use seculock_core::PinLevel;
//!
//! let (chip, gpio) = MockGpio::new();
//! let (display, _) = MockDisplay::new();
//! let pins = PinMap::default();
//!
//! let state = HardwareState::acquire(chip, display, pins.clone()).unwrap();
//! state.lock_relay().activate().unwrap();
//! assert_eq!(gpio.output_level(pins.lock_relay), Some(PinLevel::Low));
//!
//! drop(state);
//! assert_eq!(gpio.output_level(pins.lock_relay), None);
//! assert!(gpio.writes(pins.lock_relay).ends_with(&[PinLevel::High]));
//! ```

use crate::display::SharedDisplay;
use crate::error::{HardwareError, Result};
use crate::gpio::{InputPin, OutputPin, SharedGpio};
use crate::matrix::MatrixKeypad;
use crate::traits::{CharacterDisplay, GpioChip};
use seculock_core::constants::{
    KEYPAD_COL_PINS, KEYPAD_ROW_PINS, RELAY_BUZZER_PIN, RELAY_LOCK_PIN, VIBRATION_SENSOR_PINS,
};
use seculock_core::{PinLevel, Pull, SensorId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// BCM pin assignment of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    /// Keypad rows, top to bottom.
    pub keypad_rows: Vec<u32>,
    /// Keypad columns, left to right.
    pub keypad_cols: Vec<u32>,
    pub lock_relay: u32,
    pub buzzer_relay: u32,
    /// Vibration sensors; the position in the list is the [`SensorId`].
    pub tamper_sensors: Vec<u32>,
    /// Optional push button that starts a session.
    pub wake_button: Option<u32>,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            keypad_rows: KEYPAD_ROW_PINS.to_vec(),
            keypad_cols: KEYPAD_COL_PINS.to_vec(),
            lock_relay: RELAY_LOCK_PIN,
            buzzer_relay: RELAY_BUZZER_PIN,
            tamper_sensors: VIBRATION_SENSOR_PINS.to_vec(),
            wake_button: None,
        }
    }
}

impl PinMap {
    /// Check matrix size, sensor count and that no pin is used twice.
    pub fn validate(&self) -> Result<()> {
        if self.keypad_rows.len() != 4 || self.keypad_cols.len() != 4 {
            return Err(HardwareError::pin_map(
                "keypad_rows and keypad_cols must list 4 pins each",
            ));
        }
        if self.tamper_sensors.is_empty() || self.tamper_sensors.len() > usize::from(u8::MAX) {
            return Err(HardwareError::pin_map(
                "tamper_sensors must list between 1 and 255 pins",
            ));
        }
        let mut seen = HashSet::new();
        for pin in self.all_pins() {
            if !seen.insert(pin) {
                return Err(HardwareError::pin_map(format!(
                    "GPIO {pin} is assigned more than once"
                )));
            }
        }
        Ok(())
    }

    fn outputs(&self) -> Vec<u32> {
        let mut outputs = vec![self.lock_relay, self.buzzer_relay];
        outputs.extend(&self.keypad_rows);
        outputs
    }

    fn inputs(&self) -> Vec<u32> {
        let mut inputs = self.keypad_cols.clone();
        inputs.extend(&self.tamper_sensors);
        inputs.extend(self.wake_button);
        inputs
    }

    fn all_pins(&self) -> Vec<u32> {
        let mut pins = self.outputs();
        pins.extend(self.inputs());
        pins
    }
}

/// Exclusive owner of the claimed pins and the display.
pub struct HardwareState<G: GpioChip, D: CharacterDisplay> {
    chip: SharedGpio<G>,
    pins: PinMap,
    claimed: Vec<u32>,
    display: SharedDisplay<D>,
    released: bool,
}

impl<G: GpioChip, D: CharacterDisplay> HardwareState<G, D> {
    /// Claim every pin of `pins`.
    ///
    /// Outputs start high (relays off, keypad rows idle); inputs get pull-ups.
    /// If any claim fails, the pins claimed so far are released before the
    /// error is returned.
    pub fn acquire(mut chip: G, display: D, pins: PinMap) -> Result<Self> {
        pins.validate()?;

        let mut claimed = Vec::new();
        if let Err(e) = claim_all(&mut chip, &pins, &mut claimed) {
            for pin in claimed.iter().rev() {
                if let Err(release_error) = chip.release(*pin) {
                    warn!(pin, error = %release_error, "failed to release pin after partial claim");
                }
            }
            return Err(e);
        }

        info!(chip = %chip.info(), pins = claimed.len(), "hardware acquired");

        Ok(Self {
            chip: Arc::new(Mutex::new(chip)),
            pins,
            claimed,
            display: SharedDisplay::new(display),
            released: false,
        })
    }

    pub fn pin_map(&self) -> &PinMap {
        &self.pins
    }

    /// Solenoid lock relay.
    pub fn lock_relay(&self) -> OutputPin<G> {
        OutputPin::new(Arc::clone(&self.chip), self.pins.lock_relay)
    }

    /// Buzzer relay.
    pub fn buzzer_relay(&self) -> OutputPin<G> {
        OutputPin::new(Arc::clone(&self.chip), self.pins.buzzer_relay)
    }

    /// Tamper sensors with their identifiers.
    pub fn tamper_sensors(&self) -> Vec<(SensorId, InputPin<G>)> {
        self.pins
            .tamper_sensors
            .iter()
            .enumerate()
            .map(|(i, pin)| {
                // validate() caps the list at 255 entries
                let id = SensorId(u8::try_from(i).unwrap_or(u8::MAX));
                (id, InputPin::new(Arc::clone(&self.chip), *pin))
            })
            .collect()
    }

    /// Scanner over the keypad rows and columns.
    pub fn keypad(&self) -> Result<MatrixKeypad<G>> {
        let rows = self
            .pins
            .keypad_rows
            .iter()
            .map(|pin| OutputPin::new(Arc::clone(&self.chip), *pin))
            .collect();
        let cols = self
            .pins
            .keypad_cols
            .iter()
            .map(|pin| InputPin::new(Arc::clone(&self.chip), *pin))
            .collect();
        MatrixKeypad::new(rows, cols)
    }

    pub fn wake_button(&self) -> Option<InputPin<G>> {
        self.pins
            .wake_button
            .map(|pin| InputPin::new(Arc::clone(&self.chip), pin))
    }

    pub fn display(&self) -> SharedDisplay<D> {
        self.display.clone()
    }

    /// Drive both relays to their released level and give every pin back.
    ///
    /// Keeps going after individual failures and returns the first one.
    /// Calling it again is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        // A panic while a handle held the lock must not stop the release.
        let mut chip = self.chip.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut first_error = None;

        for pin in [self.pins.lock_relay, self.pins.buzzer_relay] {
            if let Err(e) = chip.write(pin, PinLevel::RELEASED) {
                error!(pin, error = %e, "failed to release relay");
                first_error.get_or_insert(e);
            }
        }
        for pin in self.claimed.iter().rev() {
            if let Err(e) = chip.release(*pin) {
                warn!(pin, error = %e, "failed to release pin");
                first_error.get_or_insert(e);
            }
        }

        info!(pins = self.claimed.len(), "hardware released");
        first_error.map_or(Ok(()), Err)
    }
}

impl<G: GpioChip, D: CharacterDisplay> Drop for HardwareState<G, D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(error = %e, "hardware release on drop failed");
        }
    }
}

fn claim_all<G: GpioChip>(chip: &mut G, pins: &PinMap, claimed: &mut Vec<u32>) -> Result<()> {
    for pin in pins.outputs() {
        chip.claim_output(pin, PinLevel::RELEASED)?;
        claimed.push(pin);
    }
    for pin in pins.inputs() {
        chip.claim_input(pin, Pull::Up)?;
        claimed.push(pin);
    }
    Ok(())
}
