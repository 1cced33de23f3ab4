//! Hardware error type.
//!
//! Every backend (sysfs, camera command, mocks) reports through
//! [`HardwareError`]. At the crate boundary it folds into
//! [`seculock_core::Error`]: capture problems stay distinguishable because the
//! authenticator treats them as a failed face check, everything else is a
//! peripheral fault.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The device went away (closed channel, unplugged bus).
    #[error("{device} is not responding")]
    Disconnected { device: String },

    /// A read or write on the pin or bus failed.
    #[error("bus error: {message}")]
    Bus { message: String },

    /// The device answered with something outside its value range.
    #[error("unexpected value: {message}")]
    UnexpectedValue { message: String },

    /// The backing interface does not exist on this host.
    #[error("device unavailable: {message}")]
    Unavailable { message: String },

    #[error("invalid pin map: {message}")]
    PinMap { message: String },

    #[error("GPIO {pin} is already claimed")]
    PinAlreadyClaimed { pin: u32 },

    /// Pin was used without being claimed, or in the wrong direction.
    #[error("GPIO {pin} is not claimed as {direction}")]
    PinNotClaimed { pin: u32, direction: &'static str },

    #[error("capture failed: {message}")]
    Capture { message: String },

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn bus(message: impl Into<String>) -> Self {
        Self::Bus {
            message: message.into(),
        }
    }

    pub fn unexpected_value(message: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn pin_map(message: impl Into<String>) -> Self {
        Self::PinMap {
            message: message.into(),
        }
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }
}

impl From<HardwareError> for seculock_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::Capture { message } => Self::Capture(message),
            other => Self::Peripheral(other.to_string()),
        }
    }
}
