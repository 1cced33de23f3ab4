//! Face detection and comparison interfaces.

#![allow(async_fn_in_trait)]

use crate::region::FaceRegion;
use image::RgbImage;
use seculock_core::Result;

/// Finds faces in a frame.
pub trait FaceDetector: Send + Sync {
    /// Bounding boxes of the faces in `frame`, most prominent first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Verification` if the detector cannot run.
    async fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceRegion>>;
}

/// Decides whether two encoded face images show the same person.
pub trait FaceComparator: Send + Sync {
    /// `reference` and `probe` are encoded images (PNG or JPEG).
    ///
    /// # Errors
    ///
    /// Returns `Error::Verification` if the comparison cannot be made, for
    /// example when either image holds no detectable face.
    async fn compare(&mut self, reference: &[u8], probe: &[u8]) -> Result<bool>;
}
