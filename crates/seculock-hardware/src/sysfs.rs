//! GPIO through the Linux sysfs interface (`/sys/class/gpio`).
//!
//! A pin is exported by writing its number to `export`, which creates a
//! `gpioN/` directory holding `direction` and `value` files. Writing `high`
//! or `low` to `direction` configures an output and sets its level in one
//! step, so a relay never glitches on while being claimed.
//!
//! The sysfs interface cannot configure bias resistors; inputs that need a
//! pull-up must get it from the device tree or an external resistor.

use crate::error::{HardwareError, Result};
use crate::traits::GpioChip;
use crate::types::DeviceInfo;
use seculock_core::{PinLevel, Pull};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

/// GPIO chip backed by sysfs files.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    claimed: HashMap<u32, Direction>,
}

impl SysfsGpio {
    /// Use the sysfs tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if `root` has no `export` file.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join("export").exists() {
            return Err(HardwareError::unavailable(format!(
                "{} is not a sysfs GPIO directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            claimed: HashMap::new(),
        })
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn export(&self, pin: u32) -> Result<PathBuf> {
        let dir = self.pin_dir(pin);
        if !dir.exists() {
            write_file(&self.root.join("export"), &pin.to_string())?;
            debug!(pin, "exported GPIO");
        }
        Ok(dir)
    }

    fn claim(&mut self, pin: u32, direction: Direction, setting: &str) -> Result<()> {
        if self.claimed.contains_key(&pin) {
            return Err(HardwareError::PinAlreadyClaimed { pin });
        }
        let dir = self.export(pin)?;
        write_file(&dir.join("direction"), setting)?;
        self.claimed.insert(pin, direction);
        Ok(())
    }

    fn ensure(&self, pin: u32, direction: Direction) -> Result<()> {
        match self.claimed.get(&pin) {
            Some(d) if *d == direction => Ok(()),
            _ => Err(HardwareError::PinNotClaimed {
                pin,
                direction: match direction {
                    Direction::In => "input",
                    Direction::Out => "output",
                },
            }),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| {
        HardwareError::bus(format!("write {}: {e}", path.display()))
    })
}

impl GpioChip for SysfsGpio {
    fn claim_output(&mut self, pin: u32, initial: PinLevel) -> Result<()> {
        let setting = match initial {
            PinLevel::High => "high",
            PinLevel::Low => "low",
        };
        self.claim(pin, Direction::Out, setting)
    }

    fn claim_input(&mut self, pin: u32, pull: Pull) -> Result<()> {
        if pull != Pull::None {
            warn!(pin, ?pull, "sysfs cannot set pull resistors, relying on board bias");
        }
        self.claim(pin, Direction::In, "in")
    }

    fn write(&mut self, pin: u32, level: PinLevel) -> Result<()> {
        self.ensure(pin, Direction::Out)?;
        write_file(&self.pin_dir(pin).join("value"), &level.to_string())
    }

    fn read(&mut self, pin: u32) -> Result<PinLevel> {
        self.ensure(pin, Direction::In)?;
        let path = self.pin_dir(pin).join("value");
        let raw = fs::read_to_string(&path)
            .map_err(|e| HardwareError::bus(format!("read {}: {e}", path.display())))?;
        match raw.trim() {
            "0" => Ok(PinLevel::Low),
            "1" => Ok(PinLevel::High),
            other => Err(HardwareError::unexpected_value(format!(
                "GPIO {pin} value {other:?}"
            ))),
        }
    }

    fn release(&mut self, pin: u32) -> Result<()> {
        if self.claimed.remove(&pin).is_some() {
            write_file(&self.root.join("unexport"), &pin.to_string())?;
        }
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("sysfs-gpio", "Linux sysfs GPIO")
            .with_location(self.root.display().to_string())
    }
}
