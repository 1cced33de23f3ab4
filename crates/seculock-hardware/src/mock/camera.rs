//! Mock camera implementation for testing and development.
//!
//! Frames (or capture failures) are queued through a [`MockCameraHandle`]
//! and returned one per capture. Capturing with nothing queued fails the
//! same way an unplugged camera does.

use crate::{HardwareError, Result, traits::Camera, types::DeviceInfo};
use image::{Rgb, RgbImage};
use tokio::sync::mpsc;

/// Outcome of one mock capture.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A frame to return.
    Frame(RgbImage),
    /// A capture failure.
    Failure(String),
}

/// Mock camera.
#[derive(Debug)]
pub struct MockCamera {
    frames_rx: mpsc::Receiver<CaptureEvent>,
}

impl MockCamera {
    /// Create a camera and the handle that feeds it.
    pub fn new() -> (Self, MockCameraHandle) {
        let (frames_tx, frames_rx) = mpsc::channel(16);
        (Self { frames_rx }, MockCameraHandle { frames_tx })
    }
}

impl Camera for MockCamera {
    async fn capture(&mut self) -> Result<RgbImage> {
        match self.frames_rx.try_recv() {
            Ok(CaptureEvent::Frame(frame)) => Ok(frame),
            Ok(CaptureEvent::Failure(message)) => Err(HardwareError::capture(message)),
            Err(_) => Err(HardwareError::capture("no frame available")),
        }
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("MockCamera", "queued frames"))
    }
}

/// Handle for feeding a [`MockCamera`].
#[derive(Debug, Clone)]
pub struct MockCameraHandle {
    frames_tx: mpsc::Sender<CaptureEvent>,
}

impl MockCameraHandle {
    /// Queue a frame for the next capture.
    pub async fn queue_frame(&self, frame: RgbImage) -> Result<()> {
        self.send(CaptureEvent::Frame(frame)).await
    }

    /// Queue a capture failure.
    pub async fn queue_failure(&self, message: impl Into<String>) -> Result<()> {
        self.send(CaptureEvent::Failure(message.into())).await
    }

    async fn send(&self, event: CaptureEvent) -> Result<()> {
        self.frames_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Camera frame channel closed"))
    }
}

/// Plain test frame of the given size and colour.
pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}
