//! Shared harness for controller scenarios.
//!
//! Builds a [`Controller`] from the default configuration on top of mock
//! devices and hands back the handles a test uses to act as the person at
//! the locker, the camera and the owner's mailbox.

#![allow(dead_code)]

use seculock_controller::{Controller, ControllerConfig, ControllerReport, Peripherals};
use seculock_core::constants::{OTP_SUBJECT, VIBRATION_SENSOR_PINS};
use seculock_core::{PinLevel, SystemClock};
use seculock_face::devices::{AnyComparator, AnyDetector};
use seculock_face::mock::{
    Comparison, MockComparator, MockComparatorHandle, MockDetector, MockDetectorHandle,
};
use seculock_hardware::devices::{AnyCamera, AnyDisplay, AnyGpioChip, AnyKeypad};
use seculock_hardware::mock::{
    MockCamera, MockCameraHandle, MockDisplay, MockDisplayHandle, MockGpio, MockGpioHandle,
    MockKeypad, MockKeypadHandle, solid_frame,
};
use seculock_hardware::{HardwareState, PinMap};
use seculock_notify::mock::{MockOutbox, MockTransport};
use seculock_notify::{AnyTransport, TransportKind};
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Everything a scenario drives or inspects.
pub struct Board {
    pub gpio: MockGpioHandle,
    pub camera: MockCameraHandle,
    pub keypad: MockKeypadHandle,
    pub display: MockDisplayHandle,
    pub detector: MockDetectorHandle,
    pub comparator: MockComparatorHandle,
    pub outbox: MockOutbox,
    pub hardware: HardwareState<AnyGpioChip, AnyDisplay>,
    pub dir: TempDir,
}

pub fn config(dir: &TempDir) -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.smtp.transport = TransportKind::Log;
    config.smtp.from = "locker@example.com".into();
    config.smtp.to = "owner@example.com".into();
    config.face.reference_image = dir.path().join("owner.png");
    config.face.probe_path = dir.path().join("captured_face.png");
    config.face.work_dir = dir.path().to_path_buf();
    config
}

/// Assemble a controller whose comparator answers `comparison`.
pub async fn assemble(comparison: Comparison) -> (Controller, Board) {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    config.validate().unwrap();

    let mut reference = Vec::new();
    solid_frame(8, 8, [180, 140, 120])
        .write_to(&mut Cursor::new(&mut reference), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&config.face.reference_image, reference).unwrap();

    let (chip, gpio) = MockGpio::new();
    let (display, display_handle) = MockDisplay::new();
    let hardware = HardwareState::acquire(
        AnyGpioChip::Mock(chip),
        AnyDisplay::Mock(display),
        PinMap::default(),
    )
    .unwrap();

    let (camera, camera_handle) = MockCamera::new();
    let (keypad, keypad_handle) = MockKeypad::new();
    let (detector, detector_handle) = MockDetector::new();
    let (comparator, comparator_handle) = MockComparator::new(comparison);
    let (transport, outbox) = MockTransport::new();

    let peripherals = Peripherals {
        camera: AnyCamera::Mock(camera),
        keypad: AnyKeypad::Mock(keypad),
        detector: AnyDetector::Mock(detector),
        comparator: AnyComparator::Mock(comparator),
        transport: AnyTransport::Mock(transport),
    };
    let controller = Controller::assemble(&config, &hardware, peripherals, Arc::new(SystemClock))
        .await
        .unwrap();

    (
        controller,
        Board {
            gpio,
            camera: camera_handle,
            keypad: keypad_handle,
            display: display_handle,
            detector: detector_handle,
            comparator: comparator_handle,
            outbox,
            hardware,
            dir,
        },
    )
}

/// Run `controller` alongside `script`, shutting down once the script ends.
pub async fn run_with<F>(controller: Controller, script: F) -> ControllerReport
where
    F: Future<Output = ()>,
{
    let shutdown = CancellationToken::new();
    let (report, ()) = tokio::join!(controller.run(shutdown.clone()), async {
        script.await;
        shutdown.cancel();
    });
    report
}

impl Board {
    /// Queue a frame for the next capture.
    pub async fn show_face(&self) {
        self.camera
            .queue_frame(solid_frame(32, 32, [90, 60, 40]))
            .await
            .unwrap();
    }

    pub async fn press_any_key(&self) {
        self.keypad.type_keys("A").await.unwrap();
    }

    /// Wait for the next OTP mail and return its code.
    pub async fn read_otp_mail(&self, nth: usize) -> String {
        loop {
            let mail = self.outbox.with_subject(OTP_SUBJECT);
            if let Some(sent) = mail.get(nth) {
                let body = &sent.notification.body;
                return body.trim_start_matches("Your OTP is: ").to_string();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn trip_sensor(&self, index: usize) {
        self.gpio
            .set_input(VIBRATION_SENSOR_PINS[index], PinLevel::ASSERTED);
    }

    pub fn settle_sensor(&self, index: usize) {
        self.gpio
            .set_input(VIBRATION_SENSOR_PINS[index], PinLevel::RELEASED);
    }
}

/// A code that differs from `code` in every digit.
pub fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect()
}
