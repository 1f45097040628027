//! Tracking module
//!
//! Landmark detection seams and the MediaPipe backend:
//! - `VideoSource` / `FaceLandmarker` / `PoseLandmarker` traits the frame
//!   driver is written against
//! - typed landmark data (joints, pose landmark indices, detector results)
//! - MediaPipe Tasks results streamed as JSON over UDP by a helper process

pub mod landmark;
pub mod mediapipe;
pub mod subprocess;

pub use landmark::{FaceLandmarkerResult, Joint, PoseJoints, PoseLandmark, PoseLandmarkerResult};

use std::cmp::Ordering;

use crate::error::TrackingError;

/// A continuously updating video feed.
pub trait VideoSource {
    /// Whatever the landmarkers consume for one frame
    type Frame;

    /// Playback position of the current frame, in seconds
    fn current_time(&self) -> f64;

    /// The current frame, or `None` until the first frame has loaded
    fn frame(&self) -> Option<&Self::Frame>;
}

/// Face landmark detection in video mode.
pub trait FaceLandmarker<F> {
    /// Detect faces in `frame`. `timestamp_ms` must be strictly increasing
    /// across calls.
    fn detect_for_video(
        &mut self,
        frame: &F,
        timestamp_ms: f64,
    ) -> Result<FaceLandmarkerResult, TrackingError>;
}

/// Body pose landmark detection in video mode.
pub trait PoseLandmarker<F> {
    /// Detect bodies in `frame`. `timestamp_ms` must be strictly increasing
    /// across calls.
    fn detect_for_video(
        &mut self,
        frame: &F,
        timestamp_ms: f64,
    ) -> Result<PoseLandmarkerResult, TrackingError>;
}

/// Rejects timestamps that do not move forward.
#[derive(Debug, Clone, Default)]
pub(crate) struct TimestampGuard {
    last_ms: Option<f64>,
}

impl TimestampGuard {
    pub(crate) fn advance(&mut self, timestamp_ms: f64) -> Result<(), TrackingError> {
        if let Some(previous) = self.last_ms {
            if timestamp_ms.partial_cmp(&previous) != Some(Ordering::Greater) {
                return Err(TrackingError::NonMonotonicTimestamp {
                    previous,
                    current: timestamp_ms,
                });
            }
        }
        self.last_ms = Some(timestamp_ms);
        Ok(())
    }
}
