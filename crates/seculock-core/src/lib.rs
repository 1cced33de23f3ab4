//! Shared building blocks for the SecuLock locker controller.
//!
//! Holds the error taxonomy every other crate converts into, the fixed
//! constants of the reference board (pin map, timings, message texts),
//! small value types (key symbols, pin levels, OTP codes) and the
//! [`Clock`] abstraction used by debounce and expiry logic.

pub mod clock;
pub mod constants;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
