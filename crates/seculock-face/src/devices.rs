//! Enum wrappers for detector and comparator dispatch.

use crate::command::{CommandComparator, CommandDetector};
use crate::mock::{MockComparator, MockDetector};
use crate::region::FaceRegion;
use crate::traits::{FaceComparator, FaceDetector};
use image::RgbImage;
use seculock_core::Result;

/// Enum wrapper for face detector dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDetector {
    /// External detection helper.
    Command(CommandDetector),
    /// Mock detector for development and testing.
    Mock(MockDetector),
}

impl FaceDetector for AnyDetector {
    async fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceRegion>> {
        match self {
            Self::Command(detector) => detector.detect(frame).await,
            Self::Mock(detector) => detector.detect(frame).await,
        }
    }
}

/// Enum wrapper for face comparator dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyComparator {
    /// External comparison helper.
    Command(CommandComparator),
    /// Mock comparator for development and testing.
    Mock(MockComparator),
}

impl FaceComparator for AnyComparator {
    async fn compare(&mut self, reference: &[u8], probe: &[u8]) -> Result<bool> {
        match self {
            Self::Command(comparator) => comparator.compare(reference, probe).await,
            Self::Mock(comparator) => comparator.compare(reference, probe).await,
        }
    }
}
