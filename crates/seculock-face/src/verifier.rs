//! Same-identity decision between the owner's reference image and a frame.

use crate::command::encode_png;
use crate::devices::{AnyComparator, AnyDetector};
use crate::traits::{FaceComparator, FaceDetector};
use image::RgbImage;
use seculock_core::constants::{DEFAULT_COMPARE_TIMEOUT, DEFAULT_DETECT_TIMEOUT};
use seculock_core::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a verification produced no decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NoFaceDetected,
    DetectorError,
    ComparatorError,
    EncodingError,
    Timeout,
    /// The camera produced no frame; set by the caller, never by the verifier.
    CaptureFailed,
}

impl FailureReason {
    /// Stable string form used in logs and alerts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFaceDetected => "no_face_detected",
            Self::DetectorError => "detector_error",
            Self::ComparatorError => "comparator_error",
            Self::EncodingError => "encoding_error",
            Self::Timeout => "timeout",
            Self::CaptureFailed => "capture_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state result of a face verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceMatch {
    Matched,
    NotMatched,
    VerificationFailed(FailureReason),
}

impl FaceMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl fmt::Display for FaceMatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Matched => f.write_str("matched"),
            Self::NotMatched => f.write_str("not_matched"),
            Self::VerificationFailed(reason) => write!(f, "verification_failed({reason})"),
        }
    }
}

/// Outcome of [`FaceVerifier::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub outcome: FaceMatch,
    /// Where the cropped probe was saved, if a face was found and saved.
    pub probe: Option<PathBuf>,
}

impl Verification {
    fn failed(reason: FailureReason) -> Self {
        Self {
            outcome: FaceMatch::VerificationFailed(reason),
            probe: None,
        }
    }
}

/// Compares captured frames against the owner's reference image.
///
/// The verifier crops the first detected face out of the frame, saves it
/// to the probe path (overwriting the previous probe) and asks the
/// comparator whether it matches the reference. It never retries.
pub struct FaceVerifier {
    reference: Vec<u8>,
    detector: AnyDetector,
    comparator: AnyComparator,
    probe_path: PathBuf,
    detect_timeout: Duration,
    compare_timeout: Duration,
}

impl fmt::Debug for FaceVerifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FaceVerifier")
            .field("reference_len", &self.reference.len())
            .field("detector", &self.detector)
            .field("comparator", &self.comparator)
            .field("probe_path", &self.probe_path)
            .field("detect_timeout", &self.detect_timeout)
            .field("compare_timeout", &self.compare_timeout)
            .finish()
    }
}

impl FaceVerifier {
    /// Build a verifier around encoded reference image bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the reference is not a decodable image.
    pub fn new(
        reference: Vec<u8>,
        detector: AnyDetector,
        comparator: AnyComparator,
        probe_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        image::load_from_memory(&reference)
            .map_err(|e| Error::Config(format!("reference image is not decodable: {e}")))?;
        Ok(Self {
            reference,
            detector,
            comparator,
            probe_path: probe_path.into(),
            detect_timeout: DEFAULT_DETECT_TIMEOUT,
            compare_timeout: DEFAULT_COMPARE_TIMEOUT,
        })
    }

    /// Load the reference image from disk once.
    pub async fn from_reference_file(
        path: &Path,
        detector: AnyDetector,
        comparator: AnyComparator,
        probe_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let reference = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Config(format!("reference image {}: {e}", path.display())))?;
        Self::new(reference, detector, comparator, probe_path)
    }

    pub fn with_timeouts(mut self, detect: Duration, compare: Duration) -> Self {
        self.detect_timeout = detect;
        self.compare_timeout = compare;
        self
    }

    pub fn probe_path(&self) -> &Path {
        &self.probe_path
    }

    /// Save the whole `frame` to the probe path, for alerts about a person
    /// whose face was not found.
    ///
    /// # Errors
    ///
    /// Returns `Error::Verification` if the frame cannot be encoded and
    /// `Error::Io` if it cannot be written.
    pub async fn save_snapshot(&self, frame: &RgbImage) -> Result<PathBuf> {
        let bytes = encode_png(frame)?;
        tokio::fs::write(&self.probe_path, &bytes).await?;
        debug!(path = %self.probe_path.display(), "snapshot saved");
        Ok(self.probe_path.clone())
    }

    /// Decide whether `frame` shows the owner.
    pub async fn verify(&mut self, frame: &RgbImage) -> Verification {
        let faces = match tokio::time::timeout(self.detect_timeout, self.detector.detect(frame)).await
        {
            Ok(Ok(faces)) => faces,
            Ok(Err(e)) => {
                warn!(error = %e, "face detection failed");
                return Verification::failed(FailureReason::DetectorError);
            }
            Err(_) => {
                warn!(timeout_ms = self.detect_timeout.as_millis() as u64, "face detection timed out");
                return Verification::failed(FailureReason::Timeout);
            }
        };
        debug!(faces = faces.len(), "faces detected");

        let Some(face) = faces.first().and_then(|region| region.crop(frame)) else {
            return Verification::failed(FailureReason::NoFaceDetected);
        };

        let probe = match encode_png(&face) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "probe encoding failed");
                return Verification::failed(FailureReason::EncodingError);
            }
        };

        let saved = match tokio::fs::write(&self.probe_path, &probe).await {
            Ok(()) => Some(self.probe_path.clone()),
            Err(e) => {
                warn!(path = %self.probe_path.display(), error = %e, "could not save probe image");
                None
            }
        };

        let outcome = match tokio::time::timeout(
            self.compare_timeout,
            self.comparator.compare(&self.reference, &probe),
        )
        .await
        {
            Ok(Ok(true)) => FaceMatch::Matched,
            Ok(Ok(false)) => FaceMatch::NotMatched,
            Ok(Err(e)) => {
                warn!(error = %e, "face comparison failed");
                FaceMatch::VerificationFailed(FailureReason::ComparatorError)
            }
            Err(_) => {
                warn!(timeout_ms = self.compare_timeout.as_millis() as u64, "face comparison timed out");
                FaceMatch::VerificationFailed(FailureReason::Timeout)
            }
        };
        info!(%outcome, "face verified");

        Verification {
            outcome,
            probe: saved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        Comparison, Detection, MockComparator, MockComparatorHandle, MockDetector,
        MockDetectorHandle,
    };
    use crate::region::FaceRegion;
    use image::{ImageFormat, Rgb};
    use rstest::rstest;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn reference_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn verifier(
        comparison: Comparison,
    ) -> (FaceVerifier, MockDetectorHandle, MockComparatorHandle, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (detector, detector_handle) = MockDetector::new();
        let (comparator, comparator_handle) = MockComparator::new(comparison);
        let verifier = FaceVerifier::new(
            reference_bytes(),
            AnyDetector::Mock(detector),
            AnyComparator::Mock(comparator),
            dir.path().join("captured_face.png"),
        )
        .unwrap();
        (verifier, detector_handle, comparator_handle, dir)
    }

    fn frame() -> RgbImage {
        RgbImage::from_pixel(32, 24, Rgb([90, 90, 90]))
    }

    #[rstest]
    #[case(Comparison::Match, FaceMatch::Matched)]
    #[case(Comparison::NoMatch, FaceMatch::NotMatched)]
    #[case(Comparison::Fail("model missing".into()), FaceMatch::VerificationFailed(FailureReason::ComparatorError))]
    #[tokio::test]
    async fn test_comparator_outcomes(#[case] comparison: Comparison, #[case] expected: FaceMatch) {
        let (mut verifier, _, _, _dir) = verifier(comparison);
        assert_eq!(verifier.verify(&frame()).await.outcome, expected);
    }

    #[tokio::test]
    async fn test_no_face_is_failure_not_mismatch() {
        let (mut verifier, detector, comparator, _dir) = verifier(Comparison::Match);
        detector.set_no_face();

        let result = verifier.verify(&frame()).await;

        assert_eq!(
            result.outcome,
            FaceMatch::VerificationFailed(FailureReason::NoFaceDetected)
        );
        assert_eq!(result.probe, None);
        assert_eq!(comparator.calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_frame_region_is_no_face() {
        let (mut verifier, detector, _, _dir) = verifier(Comparison::Match);
        detector.set_detection(Detection::Faces(vec![FaceRegion::new(500, 500, 10, 10)]));

        assert_eq!(
            verifier.verify(&frame()).await.outcome,
            FaceMatch::VerificationFailed(FailureReason::NoFaceDetected)
        );
    }

    #[tokio::test]
    async fn test_first_face_is_cropped_and_saved() {
        let (mut verifier, detector, comparator, _dir) = verifier(Comparison::Match);
        detector.set_detection(Detection::Faces(vec![
            FaceRegion::new(2, 2, 10, 8),
            FaceRegion::new(0, 0, 30, 20),
        ]));

        let result = verifier.verify(&frame()).await;

        let saved = result.probe.unwrap();
        let probe = image::open(&saved).unwrap().to_rgb8();
        assert_eq!(probe.dimensions(), (10, 8));
        assert_eq!(comparator.last_probe().unwrap(), std::fs::read(&saved).unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_keeps_full_frame() {
        let (verifier, _, comparator, _dir) = verifier(Comparison::Match);

        let saved = verifier.save_snapshot(&frame()).await.unwrap();

        assert_eq!(saved, verifier.probe_path());
        let snapshot = image::open(&saved).unwrap().to_rgb8();
        assert_eq!(snapshot.dimensions(), (32, 24));
        assert_eq!(comparator.calls(), 0);
    }

    #[tokio::test]
    async fn test_detector_error() {
        let (mut verifier, detector, _, _dir) = verifier(Comparison::Match);
        detector.set_detection(Detection::Fail("cascade not found".into()));

        assert_eq!(
            verifier.verify(&frame()).await.outcome,
            FaceMatch::VerificationFailed(FailureReason::DetectorError)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_comparator_times_out() {
        let (verifier, _, comparator, _dir) = verifier(Comparison::Match);
        let mut verifier =
            verifier.with_timeouts(Duration::from_secs(5), Duration::from_secs(15));
        comparator.set_delay(Some(Duration::from_secs(60)));

        let result = verifier.verify(&frame()).await;

        assert_eq!(
            result.outcome,
            FaceMatch::VerificationFailed(FailureReason::Timeout)
        );
        assert!(result.probe.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_detector_times_out() {
        let (mut verifier, detector, _, _dir) = verifier(Comparison::Match);
        detector.set_delay(Some(Duration::from_secs(60)));

        assert_eq!(
            verifier.verify(&frame()).await.outcome,
            FaceMatch::VerificationFailed(FailureReason::Timeout)
        );
    }

    #[test]
    fn test_undecodable_reference_rejected() {
        let (detector, _) = MockDetector::new();
        let (comparator, _) = MockComparator::new(Comparison::Match);
        let result = FaceVerifier::new(
            b"not an image".to_vec(),
            AnyDetector::Mock(detector),
            AnyComparator::Mock(comparator),
            "probe.png",
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[rstest]
    #[case(FailureReason::NoFaceDetected, "no_face_detected")]
    #[case(FailureReason::CaptureFailed, "capture_failed")]
    #[case(FailureReason::Timeout, "timeout")]
    fn test_failure_reason_strings(#[case] reason: FailureReason, #[case] expected: &str) {
        assert_eq!(reason.to_string(), expected);
    }
}
