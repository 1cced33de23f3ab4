//! Face verification for the SecuLock locker controller.
//!
//! [`FaceVerifier`] answers one question: does this camera frame show the
//! owner? It finds the face with a [`FaceDetector`], crops it, keeps a copy
//! on disk for intruder alerts, and hands it to a [`FaceComparator`]
//! together with the owner's reference image. The answer is
//! [`FaceMatch::Matched`], [`FaceMatch::NotMatched`], or
//! [`FaceMatch::VerificationFailed`] with a [`FailureReason`]. A frame
//! without a detectable face is always a failure, never a mismatch.
//!
//! Detection and comparison normally run in external helper programs
//! ([`command`]); [`mock`] provides controllable stand-ins.
//!
//! [`FaceDetector`]: traits::FaceDetector
//! [`FaceComparator`]: traits::FaceComparator

pub mod command;
pub mod devices;
pub mod mock;
pub mod region;
pub mod traits;
pub mod verifier;

pub use devices::{AnyComparator, AnyDetector};
pub use region::FaceRegion;
pub use verifier::{FaceMatch, FaceVerifier, FailureReason, Verification};
