//! Builds the runtime devices named by the configuration.

use anyhow::{Context, Result};
use seculock_controller::Peripherals;
use seculock_controller::config::{ControllerConfig, DisplayBackend, GpioBackend};
use seculock_face::command::{CommandComparator, CommandDetector};
use seculock_face::devices::{AnyComparator, AnyDetector};
use seculock_hardware::HardwareState;
use seculock_hardware::camera::CommandCamera;
use seculock_hardware::devices::{AnyCamera, AnyDisplay, AnyGpioChip, AnyKeypad};
use seculock_hardware::display::LogDisplay;
use seculock_hardware::i2c::I2cDevBus;
use seculock_hardware::lcd::Lcd1602;
use seculock_hardware::mock::{MockDisplay, MockGpio};
use seculock_hardware::sysfs::SysfsGpio;
use seculock_notify::smtp::SmtpTransport;
use seculock_notify::transport::LogTransport;
use seculock_notify::{AnyTransport, SmtpConfig, TransportKind};
use std::time::Duration;
use tracing::{info, warn};

pub type Hardware = HardwareState<AnyGpioChip, AnyDisplay>;

pub fn gpio_chip(config: &ControllerConfig) -> Result<AnyGpioChip> {
    match config.gpio.backend {
        GpioBackend::Sysfs => {
            let chip = SysfsGpio::new(&config.gpio.sysfs_root).with_context(|| {
                format!("opening GPIO at {}", config.gpio.sysfs_root.display())
            })?;
            Ok(AnyGpioChip::Sysfs(chip))
        }
        GpioBackend::Mock => {
            warn!("using in-memory GPIO, no relay will switch");
            let (chip, _handle) = MockGpio::new();
            Ok(AnyGpioChip::Mock(chip))
        }
    }
}

pub fn display(config: &ControllerConfig) -> AnyDisplay {
    match config.display.backend {
        DisplayBackend::Lcd => {
            let bus = I2cDevBus::new(config.display.i2c_bus);
            info!(bus = %bus.path().display(), address = config.display.address, "using LCD");
            AnyDisplay::Lcd(Lcd1602::new(bus, config.display.address))
        }
        DisplayBackend::Log => AnyDisplay::Log(LogDisplay::new()),
        DisplayBackend::Mock => {
            let (display, _handle) = MockDisplay::new();
            AnyDisplay::Mock(display)
        }
    }
}

pub fn acquire_hardware(config: &ControllerConfig) -> Result<Hardware> {
    let hardware = HardwareState::acquire(gpio_chip(config)?, display(config), config.pins.clone())
        .context("claiming GPIO pins")?;
    Ok(hardware)
}

pub fn transport(config: &SmtpConfig) -> Result<AnyTransport> {
    match config.transport {
        TransportKind::Smtp => {
            info!(relay = %config.relay, port = config.port, "using SMTP relay");
            Ok(AnyTransport::Smtp(SmtpTransport::new(config)?))
        }
        TransportKind::Log => {
            warn!("mail transport is log-only, no mail will be sent");
            Ok(AnyTransport::Log(LogTransport))
        }
    }
}

/// Camera, keypad, face helpers and mail transport.
pub fn peripherals(config: &ControllerConfig, hardware: &Hardware) -> Result<Peripherals> {
    std::fs::create_dir_all(&config.face.work_dir).with_context(|| {
        format!("creating work directory {}", config.face.work_dir.display())
    })?;
    if let Some(parent) = config.camera.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating capture directory {}", parent.display()))?;
    }

    let keypad = hardware
        .keypad()
        .context("building keypad scanner")?
        .with_debounce(config.timing.keypad_debounce());
    let camera = CommandCamera::new(
        config.camera.command.program.clone(),
        config.camera.command.args.clone(),
        config.camera.output.clone(),
        Duration::from_millis(config.timing.capture_timeout_ms),
    );
    let detector = CommandDetector::new(config.face.detector.to_helper(), &config.face.work_dir);
    let comparator =
        CommandComparator::new(config.face.comparator.to_helper(), &config.face.work_dir);

    Ok(Peripherals {
        camera: AnyCamera::Command(camera),
        keypad: AnyKeypad::Matrix(keypad),
        detector: AnyDetector::Command(detector),
        comparator: AnyComparator::Command(comparator),
        transport: transport(&config.smtp)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use seculock_core::constants::RELAY_LOCK_PIN;

    fn bench_config(dir: &tempfile::TempDir) -> ControllerConfig {
        let mut config = ControllerConfig::default();
        config.gpio.backend = GpioBackend::Mock;
        config.display.backend = DisplayBackend::Mock;
        config.smtp.transport = TransportKind::Log;
        config.smtp.from = "locker@example.com".into();
        config.smtp.to = "owner@example.com".into();
        config.face.work_dir = dir.path().join("work");
        config.camera.output = dir.path().join("frames").join("frame.jpg");
        config
    }

    #[test]
    fn test_mock_backends_wire_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = bench_config(&dir);

        let hardware = acquire_hardware(&config).unwrap();
        let peripherals = peripherals(&config, &hardware).unwrap();

        assert_eq!(hardware.lock_relay().pin(), RELAY_LOCK_PIN);
        assert!(matches!(peripherals.keypad, AnyKeypad::Matrix(_)));
        assert!(matches!(peripherals.transport, AnyTransport::Log(_)));
        assert!(dir.path().join("work").is_dir());
        assert!(dir.path().join("frames").is_dir());
    }

    #[test]
    fn test_lcd_backend_builds_without_touching_bus() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = bench_config(&dir);
        config.display.backend = DisplayBackend::Lcd;
        config.display.i2c_bus = 7;

        let display = display(&config);
        assert!(matches!(display, AnyDisplay::Lcd(_)));
        assert!(format!("{display:?}").contains("/dev/i2c-7"));

        // Bench config keeps mock GPIO, so acquiring succeeds on any host.
        assert!(acquire_hardware(&config).is_ok());
    }

    #[test]
    fn test_missing_sysfs_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = bench_config(&dir);
        config.gpio.backend = GpioBackend::Sysfs;
        config.gpio.sysfs_root = dir.path().join("no-gpio");

        let error = gpio_chip(&config).unwrap_err();
        assert!(error.to_string().contains("opening GPIO"));
    }

    #[tokio::test]
    async fn test_smtp_transport_builds_without_connecting() {
        let config = SmtpConfig {
            username: "locker@example.com".into(),
            password: "app-password".into(),
            to: "owner@example.com".into(),
            ..SmtpConfig::default()
        };
        assert!(matches!(transport(&config).unwrap(), AnyTransport::Smtp(_)));
    }
}
