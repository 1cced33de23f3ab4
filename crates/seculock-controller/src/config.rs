//! Controller configuration file.
//!
//! A single TOML document with one table per concern. Every field has a
//! default matching the reference board, so an empty file is a valid
//! configuration apart from the mail addresses.
//!
//! ```toml
//! [smtp]
//! username = "locker@example.com"
//! to = "owner@example.com"
//!
//! [timing]
//! unlock_hold_secs = 8
//! ```

use crate::authenticator::AuthSettings;
use crate::monitor::{MonitorSettings, SnapshotSource};
use seculock_core::constants::{
    CAPTURED_FACE_PATH, DEFAULT_BUZZER_DURATION, DEFAULT_CAPTURE_TIMEOUT, DEFAULT_COMPARE_TIMEOUT,
    DEFAULT_DETECT_TIMEOUT, DEFAULT_INTRUSION_QUIET_PERIOD, DEFAULT_OTP_ATTEMPTS,
    DEFAULT_OTP_ENTRY_TIMEOUT, DEFAULT_OTP_TTL, DEFAULT_SENSOR_POLL_INTERVAL, DEFAULT_UNLOCK_HOLD,
    KEYPAD_DEBOUNCE, KEYPAD_POLL_INTERVAL, LCD_I2C_ADDRESS, LCD_I2C_BUS, REFERENCE_IMAGE_PATH,
};
use seculock_core::{Error, Result};
use seculock_face::command::HelperCommand;
use seculock_hardware::PinMap;
use seculock_hardware::camera::OUTPUT_PLACEHOLDER;
use seculock_hardware::sysfs::SYSFS_GPIO_ROOT;
use seculock_notify::SmtpConfig;
use seculock_otp::{CodePolicy, OtpSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `smtp.password`.
pub const SMTP_PASSWORD_ENV: &str = "SECULOCK_SMTP_PASSWORD";

/// Complete controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub pins: PinMap,
    pub timing: TimingConfig,
    pub otp: OtpConfig,
    pub face: FaceConfig,
    pub camera: CameraConfig,
    pub smtp: SmtpConfig,
    pub display: DisplayConfig,
    pub gpio: GpioConfig,
}

/// `[timing]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub capture_timeout_ms: u64,
    pub unlock_hold_secs: u64,
    /// Inactivity limit between key presses while entering the OTP.
    pub entry_timeout_secs: u64,
    pub keypad_poll_ms: u64,
    pub keypad_debounce_ms: u64,
    pub sensor_poll_ms: u64,
    pub buzzer_secs: u64,
    pub intrusion_quiet_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: DEFAULT_CAPTURE_TIMEOUT.as_millis() as u64,
            unlock_hold_secs: DEFAULT_UNLOCK_HOLD.as_secs(),
            entry_timeout_secs: DEFAULT_OTP_ENTRY_TIMEOUT.as_secs(),
            keypad_poll_ms: KEYPAD_POLL_INTERVAL.as_millis() as u64,
            keypad_debounce_ms: KEYPAD_DEBOUNCE.as_millis() as u64,
            sensor_poll_ms: DEFAULT_SENSOR_POLL_INTERVAL.as_millis() as u64,
            buzzer_secs: DEFAULT_BUZZER_DURATION.as_secs(),
            intrusion_quiet_secs: DEFAULT_INTRUSION_QUIET_PERIOD.as_secs(),
        }
    }
}

impl TimingConfig {
    pub fn keypad_poll(&self) -> Duration {
        Duration::from_millis(self.keypad_poll_ms)
    }

    pub fn keypad_debounce(&self) -> Duration {
        Duration::from_millis(self.keypad_debounce_ms)
    }
}

/// `[otp]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    pub ttl_secs: u64,
    pub max_attempts: u8,
    pub policy: CodePolicy,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_OTP_TTL.as_secs(),
            max_attempts: DEFAULT_OTP_ATTEMPTS,
            policy: CodePolicy::default(),
        }
    }
}

/// External program and its argument template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn to_helper(&self) -> HelperCommand {
        HelperCommand::new(self.program.clone(), self.args.clone())
    }
}

/// `[face]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Owner's reference photo.
    pub reference_image: PathBuf,
    /// Where the cropped probe of each capture is written.
    pub probe_path: PathBuf,
    /// Scratch directory for helper exchange files.
    pub work_dir: PathBuf,
    pub detect_timeout_ms: u64,
    pub compare_timeout_ms: u64,
    /// Tamper alerts attach the probe only if it is at most this old.
    pub snapshot_max_age_secs: u64,
    pub detector: CommandConfig,
    pub comparator: CommandConfig,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            reference_image: PathBuf::from(REFERENCE_IMAGE_PATH),
            probe_path: PathBuf::from(CAPTURED_FACE_PATH),
            work_dir: std::env::temp_dir().join("seculock"),
            detect_timeout_ms: DEFAULT_DETECT_TIMEOUT.as_millis() as u64,
            compare_timeout_ms: DEFAULT_COMPARE_TIMEOUT.as_millis() as u64,
            snapshot_max_age_secs: 60,
            detector: CommandConfig::new("seculock-face-helper", &["detect", "{input}"]),
            comparator: CommandConfig::new(
                "seculock-face-helper",
                &["compare", "{reference}", "{probe}"],
            ),
        }
    }
}

impl FaceConfig {
    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }

    pub fn compare_timeout(&self) -> Duration {
        Duration::from_millis(self.compare_timeout_ms)
    }
}

/// `[camera]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// File the capture command writes the frame to.
    pub output: PathBuf,
    pub command: CommandConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            output: std::env::temp_dir().join("seculock").join("frame.jpg"),
            command: CommandConfig::new(
                "rpicam-still",
                &["-n", "-t", "1", "--width", "640", "--height", "480", "-o", OUTPUT_PLACEHOLDER],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBackend {
    /// 16x2 LCD on the I2C bus.
    #[default]
    Lcd,
    /// Screen contents go to the log.
    Log,
    /// Recorded in memory only.
    Mock,
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: DisplayBackend,
    /// Bus number, opened as `/dev/i2c-N`.
    pub i2c_bus: u8,
    /// Seven-bit address of the LCD backpack.
    pub address: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: DisplayBackend::default(),
            i2c_bus: LCD_I2C_BUS,
            address: LCD_I2C_ADDRESS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpioBackend {
    /// Linux sysfs GPIO interface.
    #[default]
    Sysfs,
    /// In-memory chip for bench runs without the board.
    Mock,
}

/// `[gpio]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: GpioBackend,
    pub sysfs_root: PathBuf,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: GpioBackend::default(),
            sysfs_root: PathBuf::from(SYSFS_GPIO_ROOT),
        }
    }
}

impl ControllerConfig {
    /// Read and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read, is not valid TOML
    /// or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Serialize back to TOML. The SMTP password is never written.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Replace the SMTP password when `password` is set.
    ///
    /// The binary passes the value of [`SMTP_PASSWORD_ENV`] here.
    pub fn apply_password_override(&mut self, password: Option<String>) {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.smtp.password = password;
        }
    }

    /// Check values the types alone cannot rule out.
    pub fn validate(&self) -> Result<()> {
        self.pins
            .validate()
            .map_err(|e| Error::Config(format!("pins: {e}")))?;
        self.smtp.validate()?;

        let timing = &self.timing;
        for (name, value) in [
            ("timing.capture_timeout_ms", timing.capture_timeout_ms),
            ("timing.entry_timeout_secs", timing.entry_timeout_secs),
            ("timing.keypad_poll_ms", timing.keypad_poll_ms),
            ("timing.sensor_poll_ms", timing.sensor_poll_ms),
            ("face.detect_timeout_ms", self.face.detect_timeout_ms),
            ("face.compare_timeout_ms", self.face.compare_timeout_ms),
            ("otp.ttl_secs", self.otp.ttl_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }
        if self.otp.max_attempts == 0 {
            return Err(Error::Config("otp.max_attempts must be at least 1".into()));
        }
        if self.camera.command.program.is_empty() {
            return Err(Error::Config("camera.command.program must be set".into()));
        }
        if self.face.detector.program.is_empty() || self.face.comparator.program.is_empty() {
            return Err(Error::Config("face helper programs must be set".into()));
        }
        Ok(())
    }

    pub fn auth_settings(&self) -> AuthSettings {
        let timing = &self.timing;
        AuthSettings {
            capture_timeout: Duration::from_millis(timing.capture_timeout_ms),
            unlock_hold: Duration::from_secs(timing.unlock_hold_secs),
            entry_timeout: Duration::from_secs(timing.entry_timeout_secs),
            keypad_poll: timing.keypad_poll(),
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        let timing = &self.timing;
        MonitorSettings {
            poll_interval: Duration::from_millis(timing.sensor_poll_ms),
            buzzer_duration: Duration::from_secs(timing.buzzer_secs),
            quiet_period: Duration::from_secs(timing.intrusion_quiet_secs),
            snapshot: Some(SnapshotSource {
                path: self.face.probe_path.clone(),
                max_age: Duration::from_secs(self.face.snapshot_max_age_secs),
            }),
        }
    }

    pub fn otp_settings(&self) -> OtpSettings {
        OtpSettings {
            ttl: Duration::from_secs(self.otp.ttl_secs),
            max_attempts: self.otp.max_attempts,
            policy: self.otp.policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use seculock_notify::TransportKind;

    const MINIMAL: &str = r#"
        [smtp]
        username = "locker@example.com"
        password = "from-file"
        to = "owner@example.com"
    "#;

    #[test]
    fn test_minimal_file_uses_board_defaults() {
        let config = ControllerConfig::from_toml(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.pins, PinMap::default());
        assert_eq!(config.auth_settings(), AuthSettings::default());
        assert_eq!(config.otp_settings(), OtpSettings::default());
        assert_eq!(config.smtp.sender(), "locker@example.com");
        assert_eq!(config.gpio.backend, GpioBackend::Sysfs);
        assert_eq!(config.display.backend, DisplayBackend::Lcd);
        assert_eq!(config.display.i2c_bus, 1);
        assert_eq!(config.display.address, 0x27);
    }

    #[test]
    fn test_empty_file_needs_mail_addresses() {
        let config = ControllerConfig::from_toml("").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = ControllerConfig::from_toml(
            r#"
            [pins]
            lock_relay = 21
            wake_button = 4

            [timing]
            unlock_hold_secs = 8
            buzzer_secs = 2

            [otp]
            policy = "no_leading_zero"
            max_attempts = 5

            [smtp]
            transport = "log"
            from = "locker@example.com"
            to = "owner@example.com"

            [gpio]
            backend = "mock"

            [display]
            backend = "log"
            address = 0x3f
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.pins.lock_relay, 21);
        assert_eq!(config.pins.wake_button, Some(4));
        assert_eq!(config.auth_settings().unlock_hold, Duration::from_secs(8));
        assert_eq!(config.monitor_settings().buzzer_duration, Duration::from_secs(2));
        assert_eq!(config.otp_settings().policy, CodePolicy::NoLeadingZero);
        assert_eq!(config.otp_settings().max_attempts, 5);
        assert_eq!(config.smtp.transport, TransportKind::Log);
        assert_eq!(config.gpio.backend, GpioBackend::Mock);
        assert_eq!(config.display.backend, DisplayBackend::Log);
        assert_eq!(config.display.address, 0x3f);
        assert_eq!(config.display.i2c_bus, 1);
    }

    #[rstest]
    #[case("[timing]\nentry_timeout_secs = 0")]
    #[case("[otp]\nmax_attempts = 0")]
    #[case("[pins]\nbuzzer_relay = 26")]
    #[case("[camera.command]\nprogram = \"\"")]
    fn test_invalid_values_rejected(#[case] extra: &str) {
        let config = ControllerConfig::from_toml(&format!("{extra}\n{MINIMAL}")).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let error = ControllerConfig::from_toml("[timing\nunlock_hold_secs = 8").unwrap_err();
        assert!(matches!(error, Error::Config(_)));
    }

    #[test]
    fn test_password_override() {
        let mut config = ControllerConfig::from_toml(MINIMAL).unwrap();

        config.apply_password_override(None);
        assert_eq!(config.smtp.password, "from-file");
        config.apply_password_override(Some(String::new()));
        assert_eq!(config.smtp.password, "from-file");
        config.apply_password_override(Some("from-env".into()));
        assert_eq!(config.smtp.password, "from-env");
    }

    #[test]
    fn test_to_toml_omits_password() {
        let config = ControllerConfig::from_toml(MINIMAL).unwrap();
        let rendered = config.to_toml().unwrap();

        assert!(!rendered.contains("from-file"));
        let reparsed = ControllerConfig::from_toml(&rendered).unwrap();
        assert_eq!(reparsed.timing, config.timing);
        assert_eq!(reparsed.smtp.to, "owner@example.com");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seculock.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = ControllerConfig::load(&path).unwrap();
        assert_eq!(config.smtp.to, "owner@example.com");

        assert!(ControllerConfig::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_shipped_example_matches_defaults() {
        let mut config =
            ControllerConfig::from_toml(include_str!("../../../seculock.toml")).unwrap();
        config.apply_password_override(Some("secret".into()));
        config.validate().unwrap();

        let defaults = ControllerConfig::default();
        assert_eq!(config.pins, defaults.pins);
        assert_eq!(config.timing, defaults.timing);
        assert_eq!(config.otp, defaults.otp);
        assert_eq!(config.display, defaults.display);
        assert_eq!(config.camera.command, defaults.camera.command);
        assert_eq!(config.face.detector, defaults.face.detector);
        assert_eq!(config.face.comparator, defaults.face.comparator);
    }
}
