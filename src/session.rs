//! Tracking session: one landmark feed driving one avatar.

use crate::avatar::{Skeleton, SkeletonPose};
use crate::config::Config;
use crate::driver::{FrameDriver, TickOutcome};
use crate::error::MirrorError;
use crate::rig::AvatarBinder;
use crate::tracking::mediapipe::{
    FaceLandmarkerOptions, MpFaceLandmarker, MpPoseLandmarker, MpReceiver, PoseLandmarkerOptions,
};

/// Everything one display-refresh step needs, owned in one place.
pub struct TrackingSession {
    receiver: MpReceiver,
    face: MpFaceLandmarker,
    pose: MpPoseLandmarker,
    driver: FrameDriver,
    binder: AvatarBinder,
    skeleton: Skeleton,
}

impl TrackingSession {
    pub fn new(config: &Config, skeleton: Skeleton) -> Self {
        Self {
            receiver: MpReceiver::new(&config.detector),
            face: MpFaceLandmarker::create_from_options(FaceLandmarkerOptions::from_config(
                &config.detector,
            )),
            pose: MpPoseLandmarker::create_from_options(PoseLandmarkerOptions::from_config(
                &config.detector,
            )),
            driver: FrameDriver::new(&config.driver),
            binder: AvatarBinder::new(&config.binder),
            skeleton,
        }
    }

    /// Bind the landmark feed socket
    pub fn start(&mut self) -> Result<(), MirrorError> {
        self.receiver.start()
    }

    pub fn receiver(&self) -> &MpReceiver {
        &self.receiver
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Pull pending feed packets, run the driver, and bind the result.
    ///
    /// Only a camera failure or a socket error is returned; detection
    /// failures are logged by the driver and the bones keep rendering.
    pub fn step(&mut self) -> Result<(TickOutcome, SkeletonPose), MirrorError> {
        self.receiver.poll()?;

        let outcome = self.driver.tick(&self.receiver, &mut self.face, &mut self.pose);
        let snapshot = self.driver.snapshot();
        let report = self.binder.apply(snapshot, &mut self.skeleton);

        if !report.reset.is_empty() || !report.held.is_empty() {
            tracing::trace!(
                "Bones reset: {:?}, held: {:?}",
                report.reset,
                report.held
            );
        }

        let pose = self.skeleton.pose(
            self.driver.frame_index(),
            snapshot.face_tracked(),
            snapshot.body_tracked(),
        );

        Ok((outcome, pose))
    }

    pub fn stop(&mut self) {
        self.receiver.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::skeleton::test_skeleton;
    use crate::avatar::{Bone, Rotation};
    use crate::error::TrackingError;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn session() -> TrackingSession {
        let mut config = Config::default();
        config.detector.port = 0;
        let mut session = TrackingSession::new(&config, test_skeleton());
        session.start().unwrap();
        session
    }

    fn send(session: &TrackingSession, payload: &str) {
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(payload.as_bytes(), session.receiver().local_addr().unwrap())
            .unwrap();
    }

    /// Step until the driver processes a new frame
    fn step_until_detected(session: &mut TrackingSession) -> SkeletonPose {
        for _ in 0..50 {
            let (outcome, pose) = session.step().unwrap();
            if matches!(outcome, TickOutcome::Detected { .. }) {
                return pose;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("no frame processed");
    }

    fn arm_packet(video_time: f64, visibility: f32) -> String {
        let joints: Vec<_> = (0..33)
            .map(|i| serde_json::json!({"x": i as f32, "y": 0.0, "z": 0.0, "visibility": visibility}))
            .collect();
        serde_json::json!({
            "video_time": video_time,
            "facial_transformation_matrixes": [glam::Mat4::from_rotation_y(0.2).to_cols_array()],
            "pose_landmarks": [joints],
        })
        .to_string()
    }

    #[test]
    fn test_neutral_before_first_frame() {
        let mut session = session();
        let (outcome, pose) = session.step().unwrap();
        assert_eq!(outcome, TickOutcome::NotReady);
        assert!(!pose.face_tracked);
        assert!(pose.bones.values().all(|r| *r == [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_packet_drives_bones() {
        let mut session = session();
        send(&session, &arm_packet(0.1, 0.9));

        let pose = step_until_detected(&mut session);
        assert!(pose.face_tracked);
        assert!(pose.body_tracked);
        assert!((pose.bones["Head"][1] - 0.2).abs() < 1e-4);
        assert!(!session.skeleton().rotation(Bone::LeftArm).is_neutral());
    }

    #[test]
    fn test_low_visibility_packet_resets_arms() {
        let mut session = session();
        send(&session, &arm_packet(0.1, 0.9));
        step_until_detected(&mut session);

        send(&session, &arm_packet(0.2, 0.3));
        step_until_detected(&mut session);
        assert_eq!(session.skeleton().rotation(Bone::LeftArm), Rotation::ZERO);
        assert_eq!(session.skeleton().rotation(Bone::RightForeArm), Rotation::ZERO);
    }

    #[test]
    fn test_camera_error_stops_step() {
        let mut session = session();
        send(&session, r#"{"camera_error": "device busy"}"#);

        let mut result = Ok(());
        for _ in 0..50 {
            if let Err(e) = session.step() {
                result = Err(e);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(matches!(
            result,
            Err(MirrorError::Tracking(TrackingError::CameraUnavailable(_)))
        ));
    }
}
