//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};

/// Generic device information.
///
/// Logged once per device when the controller starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "sysfs-gpio", "MockCamera").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional location of the device (sysfs root, bus address, command).
    pub location: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            location: None,
        }
    }

    /// Set the device location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.model)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}
