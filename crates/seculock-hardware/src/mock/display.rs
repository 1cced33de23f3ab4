//! Mock character display that records what was shown.

use crate::{HardwareError, Result, traits::CharacterDisplay};
use seculock_core::DisplayLine;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockDisplayState {
    lines: [String; 2],
    history: Vec<(DisplayLine, String)>,
    failing: bool,
}

fn lock(state: &Mutex<MockDisplayState>) -> MutexGuard<'_, MockDisplayState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock two-line display.
#[derive(Debug)]
pub struct MockDisplay {
    state: Arc<Mutex<MockDisplayState>>,
}

impl MockDisplay {
    /// Create a display and the handle that inspects it.
    pub fn new() -> (Self, MockDisplayHandle) {
        let state = Arc::new(Mutex::new(MockDisplayState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockDisplayHandle { state },
        )
    }
}

impl CharacterDisplay for MockDisplay {
    async fn write_line(&mut self, line: DisplayLine, text: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(HardwareError::bus("display bus write failed"));
        }
        state.lines[line.index()] = text.to_string();
        state.history.push((line, text.to_string()));
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(HardwareError::bus("display bus write failed"));
        }
        state.lines = Default::default();
        Ok(())
    }
}

/// Handle for inspecting a [`MockDisplay`].
#[derive(Debug, Clone)]
pub struct MockDisplayHandle {
    state: Arc<Mutex<MockDisplayState>>,
}

impl MockDisplayHandle {
    /// Both lines as currently shown, without trailing padding.
    pub fn lines(&self) -> [String; 2] {
        let state = lock(&self.state);
        [
            state.lines[0].trim_end().to_string(),
            state.lines[1].trim_end().to_string(),
        ]
    }

    /// Every line write so far, in order, with padding.
    pub fn history(&self) -> Vec<(DisplayLine, String)> {
        lock(&self.state).history.clone()
    }

    /// True if any line ever showed `text` (ignoring padding).
    pub fn has_shown(&self, text: &str) -> bool {
        lock(&self.state)
            .history
            .iter()
            .any(|(_, shown)| shown.trim_end() == text)
    }

    /// Make subsequent writes fail.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}
