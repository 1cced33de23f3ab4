//! Monotonic time source.
//!
//! Debounce windows and OTP expiry are computed from a [`Clock`] instead of
//! calling `Instant::now()` directly, so they can be tested without real
//! delays.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use seculock_core::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(300));
//! assert_eq!(clock.now() - start, Duration::from_secs(300));
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic timestamps.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current monotonic time.
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio timer.
///
/// Inside a runtime started with paused time (`start_paused = true`) this
/// clock follows the virtual time that `tokio::time::sleep` advances.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Manually advanced clock for tests.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the component under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}
