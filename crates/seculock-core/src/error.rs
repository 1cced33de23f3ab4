use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Peripheral errors
    #[error("Peripheral error: {0}")]
    Peripheral(String),

    #[error("Capture error: {0}")]
    Capture(String),

    // Identity errors
    #[error("Verification error: {0}")]
    Verification(String),

    // Messaging errors
    #[error("Delivery error: {0}")]
    Delivery(String),

    // OTP errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid OTP code: {0}")]
    InvalidOtp(String),

    #[error("Invalid key symbol: {0:?}")]
    InvalidKeySymbol(char),

    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// True for the failures the taxonomy files under "hardware": pin,
    /// bus and camera faults.
    pub fn is_peripheral(&self) -> bool {
        matches!(self, Self::Peripheral(_) | Self::Capture(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_message() {
        let error = Error::timeout("face comparison", Duration::from_secs(15));
        assert_eq!(error.to_string(), "face comparison timed out after 15000ms");
    }

    #[test]
    fn test_is_peripheral() {
        assert!(Error::Peripheral("gpio 17".into()).is_peripheral());
        assert!(Error::Capture("no frame".into()).is_peripheral());
        assert!(!Error::Delivery("smtp".into()).is_peripheral());
    }
}
