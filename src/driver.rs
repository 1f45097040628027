//! Frame driver
//!
//! Runs once per display refresh: skips frames the video has not advanced
//! past, stamps detector calls with synthetic strictly increasing timestamps
//! and keeps the latest detection snapshot for the binder.

use std::collections::HashMap;

use crate::avatar::Rotation;
use crate::config::DriverConfig;
use crate::rig::mapper;
use crate::tracking::{FaceLandmarker, PoseJoints, PoseLandmarker, VideoSource};

/// Latest detection results. Only the most recent frame is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSnapshot {
    /// Head orientation from the first face's transform
    pub face_rotation: Option<Rotation>,
    /// Blendshape scores of the first face (not used for bones)
    pub face_blendshapes: HashMap<String, f32>,
    /// Joints of the first detected body
    pub body: Option<PoseJoints>,
    /// Detector timestamp of the frame that last wrote the snapshot
    pub timestamp_ms: Option<f64>,
}

impl DetectionSnapshot {
    /// A face was seen, through its transform or its blendshapes
    pub fn face_tracked(&self) -> bool {
        self.face_rotation.is_some() || !self.face_blendshapes.is_empty()
    }

    pub fn body_tracked(&self) -> bool {
        self.body.is_some()
    }
}

/// Result of one driver tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The video has no frame yet
    NotReady,
    /// Same playback position as the last processed frame
    Unchanged,
    /// Both landmarkers ran
    Detected { face: bool, body: bool },
    /// A landmarker failed; the snapshot keeps whatever was written before
    Failed,
}

/// Owns the detection snapshot and the timestamp sequence.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    frame_interval_ms: f64,
    retain_on_miss: bool,
    frame_index: u64,
    last_video_time: Option<f64>,
    snapshot: DetectionSnapshot,
}

impl FrameDriver {
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            frame_interval_ms: config.frame_interval_ms,
            retain_on_miss: config.retain_on_miss,
            frame_index: 0,
            last_video_time: None,
            snapshot: DetectionSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &DetectionSnapshot {
        &self.snapshot
    }

    /// Number of ticks run so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Run one tick against `video` with the given landmarkers.
    pub fn tick<V, F, P>(&mut self, video: &V, face: &mut F, pose: &mut P) -> TickOutcome
    where
        V: VideoSource,
        F: FaceLandmarker<V::Frame>,
        P: PoseLandmarker<V::Frame>,
    {
        let timestamp_ms = self.frame_index as f64 * self.frame_interval_ms;
        self.frame_index += 1;

        let frame = match video.frame() {
            Some(f) => f,
            None => return TickOutcome::NotReady,
        };

        let video_time = video.current_time();
        if self.last_video_time == Some(video_time) {
            return TickOutcome::Unchanged;
        }
        self.last_video_time = Some(video_time);

        let face_result = match face.detect_for_video(frame, timestamp_ms) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Error during face detection: {}", e);
                return TickOutcome::Failed;
            }
        };

        match face_result.first_transform().map(mapper::euler_from_matrix) {
            Some(rotation) => self.snapshot.face_rotation = Some(rotation),
            None if !self.retain_on_miss => self.snapshot.face_rotation = None,
            None => {}
        }
        match face_result.face_blendshapes.into_iter().next() {
            Some(blendshapes) => self.snapshot.face_blendshapes = blendshapes,
            None if !self.retain_on_miss => self.snapshot.face_blendshapes.clear(),
            None => {}
        }
        self.snapshot.timestamp_ms = Some(timestamp_ms);

        let pose_result = match pose.detect_for_video(frame, timestamp_ms) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Error during pose detection: {}", e);
                return TickOutcome::Failed;
            }
        };

        match pose_result.first_body() {
            Some(body) => self.snapshot.body = Some(body.clone()),
            None if !self.retain_on_miss => self.snapshot.body = None,
            None => {}
        }

        tracing::trace!(
            "Frame {} at {:.1}ms: face={}, body={}",
            self.frame_index - 1,
            timestamp_ms,
            self.snapshot.face_tracked(),
            self.snapshot.body_tracked()
        );

        TickOutcome::Detected {
            face: self.snapshot.face_tracked(),
            body: self.snapshot.body_tracked(),
        }
    }
}
