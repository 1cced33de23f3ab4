//! Face bounding boxes and cropping.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of a detected face, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the box to a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the box lies inside the frame.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Option<Self> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        let width = self.width.min(frame_width - self.x);
        let height = self.height.min(frame_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self::new(self.x, self.y, width, height))
    }

    /// Copy the clamped region out of `frame`.
    pub fn crop(&self, frame: &RgbImage) -> Option<RgbImage> {
        let region = self.clamp(frame.width(), frame.height())?;
        Some(
            image::imageops::crop_imm(frame, region.x, region.y, region.width, region.height)
                .to_image(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rstest::rstest;

    #[rstest]
    #[case(FaceRegion::new(10, 10, 20, 20), Some(FaceRegion::new(10, 10, 20, 20)))]
    #[case(FaceRegion::new(90, 80, 50, 50), Some(FaceRegion::new(90, 80, 10, 20)))]
    #[case(FaceRegion::new(100, 0, 10, 10), None)]
    #[case(FaceRegion::new(0, 100, 10, 10), None)]
    #[case(FaceRegion::new(5, 5, 0, 10), None)]
    fn test_clamp(#[case] region: FaceRegion, #[case] expected: Option<FaceRegion>) {
        assert_eq!(region.clamp(100, 100), expected);
    }

    #[test]
    fn test_crop_copies_pixels() {
        let mut frame = RgbImage::new(8, 8);
        frame.put_pixel(3, 4, Rgb([200, 100, 50]));

        let face = FaceRegion::new(2, 3, 4, 4).crop(&frame).unwrap();

        assert_eq!(face.dimensions(), (4, 4));
        assert_eq!(face.get_pixel(1, 1), &Rgb([200, 100, 50]));
    }

    #[test]
    fn test_deserialize() {
        let region: FaceRegion =
            serde_json::from_str(r#"{"x":1,"y":2,"width":3,"height":4}"#).unwrap();
        assert_eq!(region, FaceRegion::new(1, 2, 3, 4));
    }
}
