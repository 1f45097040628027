//! Typed landmark data produced by the face and pose landmarkers.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A detected body keypoint: position plus visibility confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Joint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Missing from some landmarker outputs; treated as "not visible"
    #[serde(default)]
    pub visibility: f32,
}

impl Joint {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Strictly above the threshold
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }
}

/// The 33 MediaPipe pose landmark indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const COUNT: usize = 33;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One detected body, joints ordered by `PoseLandmark` index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseJoints(Vec<Joint>);

impl PoseJoints {
    pub fn new(joints: Vec<Joint>) -> Self {
        Self(joints)
    }

    pub fn get(&self, landmark: PoseLandmark) -> Option<&Joint> {
        self.0.get(landmark.index())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.0
    }
}

/// Output of one face landmarker call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceLandmarkerResult {
    /// Column-major 4x4 face transforms, one per detected face
    pub facial_transformation_matrixes: Vec<Mat4>,
    /// Blendshape name -> score, one map per detected face
    pub face_blendshapes: Vec<HashMap<String, f32>>,
}

impl FaceLandmarkerResult {
    /// Transform of the first detected face
    pub fn first_transform(&self) -> Option<&Mat4> {
        self.facial_transformation_matrixes.first()
    }
}

/// Output of one pose landmarker call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseLandmarkerResult {
    /// One joint set per detected body
    pub landmarks: Vec<PoseJoints>,
}

impl PoseLandmarkerResult {
    /// Joints of the first detected body, if any joints were reported
    pub fn first_body(&self) -> Option<&PoseJoints> {
        self.landmarks.first().filter(|body| !body.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_visibility_is_strict() {
        let joint = Joint::new(0.0, 0.0, 0.0, 0.5);
        assert!(!joint.is_visible(0.5));
        assert!(Joint::new(0.0, 0.0, 0.0, 0.51).is_visible(0.5));
    }

    #[test]
    fn test_parse_joint_without_visibility() {
        let joint: Joint = serde_json::from_str(r#"{"x":0.1,"y":0.2,"z":-0.3}"#).unwrap();
        assert_eq!(joint.visibility, 0.0);
        assert_eq!(joint.position(), Vec3::new(0.1, 0.2, -0.3));
    }

    #[test]
    fn test_pose_joints_lookup() {
        let joints = (0..PoseLandmark::COUNT)
            .map(|i| Joint::new(i as f32, 0.0, 0.0, 1.0))
            .collect();
        let body = PoseJoints::new(joints);

        assert_eq!(body.get(PoseLandmark::RightShoulder).unwrap().x, 12.0);
        assert_eq!(body.get(PoseLandmark::LeftWrist).unwrap().x, 15.0);
        assert_eq!(body.get(PoseLandmark::RightFootIndex).unwrap().x, 32.0);
    }

    #[test]
    fn test_truncated_body() {
        let body = PoseJoints::new(vec![Joint::default(); 12]);
        assert!(body.get(PoseLandmark::MouthRight).is_some());
        assert!(body.get(PoseLandmark::RightShoulder).is_none());
    }

    #[test]
    fn test_first_body_skips_empty() {
        let result = PoseLandmarkerResult {
            landmarks: vec![PoseJoints::default()],
        };
        assert!(result.first_body().is_none());
        assert!(PoseLandmarkerResult::default().first_body().is_none());
    }
}
