//! Mock I2C bus that records every byte written.

use crate::{HardwareError, Result, traits::I2cBus};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockI2cState {
    writes: Vec<(u8, u8)>,
    failing: bool,
}

fn lock(state: &Mutex<MockI2cState>) -> MutexGuard<'_, MockI2cState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock I2C bus.
#[derive(Debug)]
pub struct MockI2cBus {
    state: Arc<Mutex<MockI2cState>>,
}

impl MockI2cBus {
    /// Create a bus and the handle that inspects it.
    pub fn new() -> (Self, MockI2cHandle) {
        let state = Arc::new(Mutex::new(MockI2cState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockI2cHandle { state },
        )
    }
}

impl I2cBus for MockI2cBus {
    fn write_byte(&mut self, address: u8, byte: u8) -> Result<()> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(HardwareError::bus(format!(
                "no ack from 0x{address:02x}"
            )));
        }
        state.writes.push((address, byte));
        Ok(())
    }
}

/// Handle for inspecting a [`MockI2cBus`].
#[derive(Debug, Clone)]
pub struct MockI2cHandle {
    state: Arc<Mutex<MockI2cState>>,
}

impl MockI2cHandle {
    /// Bytes written to `address`, in order.
    pub fn bytes_to(&self, address: u8) -> Vec<u8> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, b)| *b)
            .collect()
    }

    /// Forget recorded writes.
    pub fn clear(&self) {
        lock(&self.state).writes.clear();
    }

    /// Make subsequent writes fail.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}
