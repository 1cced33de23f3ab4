//! Mock detector and comparator for testing and development.
//!
//! Both mocks answer with a fixed behaviour that tests change at any time
//! through their handles.

use crate::region::FaceRegion;
use crate::traits::{FaceComparator, FaceDetector};
use image::RgbImage;
use seculock_core::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// What the mock detector reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// One face covering the whole frame.
    WholeFrame,
    /// These regions.
    Faces(Vec<FaceRegion>),
    /// A detector failure.
    Fail(String),
}

#[derive(Debug)]
struct DetectorState {
    detection: Detection,
    delay: Option<Duration>,
    calls: usize,
}

/// Mock face detector.
#[derive(Debug)]
pub struct MockDetector {
    state: Arc<Mutex<DetectorState>>,
}

impl MockDetector {
    /// Create a detector that finds one whole-frame face.
    pub fn new() -> (Self, MockDetectorHandle) {
        let state = Arc::new(Mutex::new(DetectorState {
            detection: Detection::WholeFrame,
            delay: None,
            calls: 0,
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockDetectorHandle { state },
        )
    }
}

impl FaceDetector for MockDetector {
    async fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceRegion>> {
        let (detection, delay) = {
            let mut state = lock(&self.state);
            state.calls += 1;
            (state.detection.clone(), state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match detection {
            Detection::WholeFrame => Ok(vec![FaceRegion::new(0, 0, frame.width(), frame.height())]),
            Detection::Faces(faces) => Ok(faces),
            Detection::Fail(message) => Err(Error::Verification(message)),
        }
    }
}

/// Handle for steering a [`MockDetector`].
#[derive(Debug, Clone)]
pub struct MockDetectorHandle {
    state: Arc<Mutex<DetectorState>>,
}

impl MockDetectorHandle {
    pub fn set_detection(&self, detection: Detection) {
        lock(&self.state).detection = detection;
    }

    /// Report no faces from now on.
    pub fn set_no_face(&self) {
        self.set_detection(Detection::Faces(Vec::new()));
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    pub fn calls(&self) -> usize {
        lock(&self.state).calls
    }
}

/// What the mock comparator answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    NoMatch,
    Fail(String),
}

#[derive(Debug)]
struct ComparatorState {
    comparison: Comparison,
    delay: Option<Duration>,
    calls: usize,
    last_probe: Option<Vec<u8>>,
}

/// Mock face comparator.
#[derive(Debug)]
pub struct MockComparator {
    state: Arc<Mutex<ComparatorState>>,
}

impl MockComparator {
    /// Create a comparator with the given initial answer.
    pub fn new(comparison: Comparison) -> (Self, MockComparatorHandle) {
        let state = Arc::new(Mutex::new(ComparatorState {
            comparison,
            delay: None,
            calls: 0,
            last_probe: None,
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockComparatorHandle { state },
        )
    }
}

impl FaceComparator for MockComparator {
    async fn compare(&mut self, _reference: &[u8], probe: &[u8]) -> Result<bool> {
        let (comparison, delay) = {
            let mut state = lock(&self.state);
            state.calls += 1;
            state.last_probe = Some(probe.to_vec());
            (state.comparison.clone(), state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match comparison {
            Comparison::Match => Ok(true),
            Comparison::NoMatch => Ok(false),
            Comparison::Fail(message) => Err(Error::Verification(message)),
        }
    }
}

/// Handle for steering a [`MockComparator`].
#[derive(Debug, Clone)]
pub struct MockComparatorHandle {
    state: Arc<Mutex<ComparatorState>>,
}

impl MockComparatorHandle {
    pub fn set_comparison(&self, comparison: Comparison) {
        lock(&self.state).comparison = comparison;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    pub fn calls(&self) -> usize {
        lock(&self.state).calls
    }

    /// Probe bytes passed to the most recent comparison.
    pub fn last_probe(&self) -> Option<Vec<u8>> {
        lock(&self.state).last_probe.clone()
    }
}
