//! Mock GPIO chip for testing and development.
//!
//! The chip keeps pin ownership and levels in memory. Tests drive inputs
//! through a [`MockGpioHandle`]: set a sensor level, hold a keypad key
//! (which connects a row pin to a column pin), or make a pin fail.

use crate::{
    HardwareError, Result,
    traits::GpioChip,
    types::DeviceInfo,
};
use seculock_core::{PinLevel, Pull};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockGpioState {
    outputs: HashMap<u32, PinLevel>,
    inputs: HashMap<u32, Pull>,
    input_levels: HashMap<u32, PinLevel>,
    held_keys: HashSet<(u32, u32)>,
    faulty: HashSet<u32>,
    writes: Vec<(u32, PinLevel)>,
    released: Vec<u32>,
}

impl MockGpioState {
    fn is_claimed(&self, pin: u32) -> bool {
        self.outputs.contains_key(&pin) || self.inputs.contains_key(&pin)
    }

    fn check_fault(&self, pin: u32) -> Result<()> {
        if self.faulty.contains(&pin) {
            return Err(HardwareError::bus(format!("GPIO {pin} fault")));
        }
        Ok(())
    }

    fn sample(&self, pin: u32, pull: Pull) -> PinLevel {
        let shorted_to_low_row = self
            .held_keys
            .iter()
            .any(|(row, col)| *col == pin && self.outputs.get(row) == Some(&PinLevel::Low));
        if shorted_to_low_row {
            return PinLevel::Low;
        }
        match self.input_levels.get(&pin) {
            Some(level) => *level,
            None if pull == Pull::Down => PinLevel::Low,
            None => PinLevel::High,
        }
    }
}

fn lock(state: &Mutex<MockGpioState>) -> MutexGuard<'_, MockGpioState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock GPIO chip.
///
/// # Examples
///
/// ```
/// use seculock_hardware::mock::MockGpio;
/// use seculock_hardware::traits::GpioChip;
/// use seculock_core::{PinLevel, Pull};
///
/// let (mut chip, handle) = MockGpio::new();
/// chip.claim_input(23, Pull::Up).unwrap();
/// assert_eq!(chip.read(23).unwrap(), PinLevel::High);
///
/// handle.set_input(23, PinLevel::Low);
/// assert_eq!(chip.read(23).unwrap(), PinLevel::Low);
/// ```
#[derive(Debug)]
pub struct MockGpio {
    state: Arc<Mutex<MockGpioState>>,
}

impl MockGpio {
    /// Create a chip and the handle that controls it.
    pub fn new() -> (Self, MockGpioHandle) {
        let state = Arc::new(Mutex::new(MockGpioState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockGpioHandle { state },
        )
    }
}

impl GpioChip for MockGpio {
    fn claim_output(&mut self, pin: u32, initial: PinLevel) -> Result<()> {
        let mut state = lock(&self.state);
        if state.is_claimed(pin) {
            return Err(HardwareError::PinAlreadyClaimed { pin });
        }
        state.check_fault(pin)?;
        state.outputs.insert(pin, initial);
        state.writes.push((pin, initial));
        Ok(())
    }

    fn claim_input(&mut self, pin: u32, pull: Pull) -> Result<()> {
        let mut state = lock(&self.state);
        if state.is_claimed(pin) {
            return Err(HardwareError::PinAlreadyClaimed { pin });
        }
        state.check_fault(pin)?;
        state.inputs.insert(pin, pull);
        Ok(())
    }

    fn write(&mut self, pin: u32, level: PinLevel) -> Result<()> {
        let mut state = lock(&self.state);
        state.check_fault(pin)?;
        match state.outputs.get_mut(&pin) {
            Some(current) => *current = level,
            None => {
                return Err(HardwareError::PinNotClaimed {
                    pin,
                    direction: "output",
                });
            }
        }
        state.writes.push((pin, level));
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<PinLevel> {
        let state = lock(&self.state);
        state.check_fault(pin)?;
        let pull = *state.inputs.get(&pin).ok_or(HardwareError::PinNotClaimed {
            pin,
            direction: "input",
        })?;
        Ok(state.sample(pin, pull))
    }

    fn release(&mut self, pin: u32) -> Result<()> {
        let mut state = lock(&self.state);
        let was_output = state.outputs.remove(&pin).is_some();
        let was_input = state.inputs.remove(&pin).is_some();
        if was_output || was_input {
            state.released.push(pin);
        }
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("MockGpio", "in-memory GPIO")
    }
}

/// Handle for controlling a [`MockGpio`] from tests.
///
/// Clones share the same chip.
#[derive(Debug, Clone)]
pub struct MockGpioHandle {
    state: Arc<Mutex<MockGpioState>>,
}

impl MockGpioHandle {
    /// Force the level seen on an input pin.
    pub fn set_input(&self, pin: u32, level: PinLevel) {
        lock(&self.state).input_levels.insert(pin, level);
    }

    /// Hold the key that connects `row_pin` to `col_pin`.
    pub fn hold_key(&self, row_pin: u32, col_pin: u32) {
        lock(&self.state).held_keys.insert((row_pin, col_pin));
    }

    /// Let go of a held key.
    pub fn release_key(&self, row_pin: u32, col_pin: u32) {
        lock(&self.state).held_keys.remove(&(row_pin, col_pin));
    }

    /// Make every operation on `pin` fail.
    pub fn fail_pin(&self, pin: u32) {
        lock(&self.state).faulty.insert(pin);
    }

    /// Clear a failure set by [`fail_pin`](Self::fail_pin).
    pub fn heal_pin(&self, pin: u32) {
        lock(&self.state).faulty.remove(&pin);
    }

    /// Current level of a claimed output.
    pub fn output_level(&self, pin: u32) -> Option<PinLevel> {
        lock(&self.state).outputs.get(&pin).copied()
    }

    /// Every level written to `pin`, including the initial one, in order.
    pub fn writes(&self, pin: u32) -> Vec<PinLevel> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
            .collect()
    }

    /// True while `pin` is claimed in either direction.
    pub fn is_claimed(&self, pin: u32) -> bool {
        lock(&self.state).is_claimed(pin)
    }

    /// Pull configured for a claimed input.
    pub fn pull(&self, pin: u32) -> Option<Pull> {
        lock(&self.state).inputs.get(&pin).copied()
    }

    /// Pins released so far, in release order.
    pub fn released_pins(&self) -> Vec<u32> {
        lock(&self.state).released.clone()
    }
}
