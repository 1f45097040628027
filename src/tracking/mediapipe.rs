//! MediaPipe landmarker backend
//!
//! The helper process (`scripts/landmark_feed.py`) owns the camera and runs
//! the MediaPipe Tasks face and pose landmarkers; every processed frame is
//! sent here as one JSON datagram. `MpReceiver` is the video source the
//! frame driver polls, and the two landmarkers unpack a packet into typed
//! results under the same contract as the Tasks API (video running mode,
//! strictly increasing timestamps, opt-in outputs).

use glam::Mat4;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};

use crate::config::{Delegate, DetectorConfig, RunningMode};
use crate::error::{MirrorError, TrackingError};
use crate::tracking::{
    FaceLandmarker, FaceLandmarkerResult, PoseJoints, PoseLandmarker, PoseLandmarkerResult,
    TimestampGuard, VideoSource,
};

/// A single JSON packet from the landmarker helper
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MpPacket {
    /// Playback position of the processed camera frame (seconds)
    pub video_time: f64,
    /// Column-major 4x4 face transforms
    #[serde(default)]
    pub facial_transformation_matrixes: Vec<[f32; 16]>,
    /// Blendshape name -> score, per face
    #[serde(default)]
    pub face_blendshapes: Vec<HashMap<String, f32>>,
    /// 33 joints per detected body
    #[serde(default)]
    pub pose_landmarks: Vec<PoseJoints>,
    /// Set when the helper could not open the camera
    #[serde(default)]
    pub camera_error: Option<String>,
}

/// Frameless status packet the helper sends when the camera cannot be opened
#[derive(Debug, Deserialize)]
struct HelperStatus {
    camera_error: String,
}

/// MediaPipe JSON-over-UDP receiver
pub struct MpReceiver {
    config: DetectorConfig,
    socket: Option<UdpSocket>,
    latest: Option<MpPacket>,
    packets_received: u64,
}

impl MpReceiver {
    /// Create a new receiver (does not bind yet)
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            config: config.clone(),
            socket: None,
            latest: None,
            packets_received: 0,
        }
    }

    /// Bind the UDP socket and start receiving
    pub fn start(&mut self) -> Result<(), MirrorError> {
        let addr = format!("{}:{}", self.config.listen_address, self.config.port);

        let socket = UdpSocket::bind(&addr).map_err(|e| {
            TrackingError::Receiver(format!("Failed to bind to {}: {}", addr, e))
        })?;

        socket.set_nonblocking(true).map_err(|e| {
            TrackingError::Receiver(format!("Failed to set non-blocking: {}", e))
        })?;

        tracing::info!("Landmark receiver listening on {}", addr);
        self.socket = Some(socket);

        Ok(())
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Drain pending datagrams, keeping the newest packet.
    ///
    /// Returns the number of packets accepted. Malformed datagrams are logged
    /// and dropped; a camera error reported by the helper is returned as
    /// `TrackingError::CameraUnavailable`.
    pub fn poll(&mut self) -> Result<usize, MirrorError> {
        let socket = match &self.socket {
            Some(s) => s,
            None => return Ok(0),
        };

        let mut buf = [0u8; 65536];
        let mut accepted = 0;

        loop {
            match socket.recv(&mut buf) {
                Ok(0) => continue,
                Ok(size) => {
                    let packet: MpPacket = match serde_json::from_slice(&buf[..size]) {
                        Ok(p) => p,
                        Err(e) => {
                            // Camera failures arrive without a frame
                            if let Ok(status) =
                                serde_json::from_slice::<HelperStatus>(&buf[..size])
                            {
                                return Err(
                                    TrackingError::CameraUnavailable(status.camera_error).into()
                                );
                            }
                            tracing::warn!("Dropping landmark packet: JSON parse error: {}", e);
                            continue;
                        }
                    };

                    if let Some(message) = packet.camera_error {
                        return Err(TrackingError::CameraUnavailable(message).into());
                    }

                    self.latest = Some(packet);
                    self.packets_received += 1;
                    accepted += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    return Err(TrackingError::Receiver(format!("Receive error: {}", e)).into());
                }
            }
        }

        Ok(accepted)
    }

    /// Most recently accepted packet
    pub fn latest(&self) -> Option<&MpPacket> {
        self.latest.as_ref()
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// Stop the receiver
    pub fn stop(&mut self) {
        self.socket = None;
        tracing::info!("Landmark receiver stopped");
    }
}

impl VideoSource for MpReceiver {
    type Frame = MpPacket;

    fn current_time(&self) -> f64 {
        self.latest.as_ref().map(|p| p.video_time).unwrap_or(0.0)
    }

    fn frame(&self) -> Option<&MpPacket> {
        self.latest.as_ref()
    }
}

/// Face landmarker options
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarkerOptions {
    pub model_asset_path: String,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    pub output_face_blendshapes: bool,
    pub output_facial_transformation_matrixes: bool,
}

impl FaceLandmarkerOptions {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            model_asset_path: config.face_model.clone(),
            delegate: config.delegate,
            running_mode: config.running_mode,
            output_face_blendshapes: config.output_face_blendshapes,
            output_facial_transformation_matrixes: config.output_facial_transformation_matrixes,
        }
    }
}

/// Pose landmarker options
#[derive(Debug, Clone, PartialEq)]
pub struct PoseLandmarkerOptions {
    pub model_asset_path: String,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
}

impl PoseLandmarkerOptions {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            model_asset_path: config.pose_model.clone(),
            delegate: config.delegate,
            running_mode: config.running_mode,
        }
    }
}

fn check_video_mode(mode: RunningMode) -> Result<(), TrackingError> {
    if mode == RunningMode::Video {
        Ok(())
    } else {
        Err(TrackingError::UnsupportedRunningMode(mode.to_string()))
    }
}

/// Face landmarker over helper packets
#[derive(Debug)]
pub struct MpFaceLandmarker {
    options: FaceLandmarkerOptions,
    timestamps: TimestampGuard,
}

impl MpFaceLandmarker {
    pub fn create_from_options(options: FaceLandmarkerOptions) -> Self {
        tracing::debug!(
            "Face landmarker: model={}, delegate={}, mode={}",
            options.model_asset_path,
            options.delegate.as_str(),
            options.running_mode
        );
        Self {
            options,
            timestamps: TimestampGuard::default(),
        }
    }

    pub fn options(&self) -> &FaceLandmarkerOptions {
        &self.options
    }
}

impl FaceLandmarker<MpPacket> for MpFaceLandmarker {
    fn detect_for_video(
        &mut self,
        frame: &MpPacket,
        timestamp_ms: f64,
    ) -> Result<FaceLandmarkerResult, TrackingError> {
        check_video_mode(self.options.running_mode)?;
        self.timestamps.advance(timestamp_ms)?;

        let facial_transformation_matrixes = if self.options.output_facial_transformation_matrixes
        {
            frame
                .facial_transformation_matrixes
                .iter()
                .map(Mat4::from_cols_array)
                .collect()
        } else {
            Vec::new()
        };

        let face_blendshapes = if self.options.output_face_blendshapes {
            frame.face_blendshapes.clone()
        } else {
            Vec::new()
        };

        Ok(FaceLandmarkerResult {
            facial_transformation_matrixes,
            face_blendshapes,
        })
    }
}

/// Pose landmarker over helper packets
#[derive(Debug)]
pub struct MpPoseLandmarker {
    options: PoseLandmarkerOptions,
    timestamps: TimestampGuard,
}

impl MpPoseLandmarker {
    pub fn create_from_options(options: PoseLandmarkerOptions) -> Self {
        tracing::debug!(
            "Pose landmarker: model={}, delegate={}, mode={}",
            options.model_asset_path,
            options.delegate.as_str(),
            options.running_mode
        );
        Self {
            options,
            timestamps: TimestampGuard::default(),
        }
    }
}

impl PoseLandmarker<MpPacket> for MpPoseLandmarker {
    fn detect_for_video(
        &mut self,
        frame: &MpPacket,
        timestamp_ms: f64,
    ) -> Result<PoseLandmarkerResult, TrackingError> {
        check_video_mode(self.options.running_mode)?;
        self.timestamps.advance(timestamp_ms)?;

        Ok(PoseLandmarkerResult {
            landmarks: frame.pose_landmarks.clone(),
        })
    }
}
