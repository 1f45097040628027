//! Landmarker helper subprocess
//!
//! Launches the Python MediaPipe helper as a child process with automatic
//! cleanup on drop.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::config::{CameraConfig, DetectorConfig};
use crate::error::{MirrorError, TrackingError};

/// Manages the landmarker helper subprocess
pub struct LandmarkerSubprocess {
    child: Option<Child>,
    detector: DetectorConfig,
    camera: CameraConfig,
}

impl LandmarkerSubprocess {
    /// Create a new subprocess manager (does not start the process)
    pub fn new(detector: &DetectorConfig, camera: &CameraConfig) -> Self {
        Self {
            child: None,
            detector: detector.clone(),
            camera: camera.clone(),
        }
    }

    /// Command-line arguments passed to the helper script
    pub fn args(&self) -> Vec<String> {
        let d = &self.detector;
        let c = &self.camera;
        let mut args = vec![
            d.helper_script.clone(),
            "--ip".to_string(),
            d.listen_address.clone(),
            "--port".to_string(),
            d.port.to_string(),
            "--capture".to_string(),
            c.device.to_string(),
            "--width".to_string(),
            c.width.to_string(),
            "--height".to_string(),
            c.height.to_string(),
            "--fps".to_string(),
            c.fps.to_string(),
            "--delegate".to_string(),
            d.delegate.as_str().to_string(),
            "--running-mode".to_string(),
            d.running_mode.to_string(),
            "--face-model".to_string(),
            d.face_model.clone(),
            "--pose-model".to_string(),
            d.pose_model.clone(),
        ];
        if d.output_face_blendshapes {
            args.push("--blendshapes".to_string());
        }
        if d.output_facial_transformation_matrixes {
            args.push("--transformation-matrixes".to_string());
        }
        args
    }

    /// Launch the helper subprocess.
    ///
    /// Must be called from within a tokio runtime: the helper's stderr is
    /// forwarded to `tracing` by a spawned task.
    pub fn start(&mut self) -> Result<(), MirrorError> {
        if self.is_running() {
            return Ok(());
        }

        let mut child = Command::new("python3")
            .args(self.args())
            .kill_on_drop(true)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| {
                TrackingError::Subprocess(format!(
                    "Failed to launch landmarker helper at '{}': {}",
                    self.detector.helper_script, e
                ))
            })?;

        // An unread pipe would stall the helper once its buffer fills
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "landmarker", "{}", line);
                }
            });
        }

        tracing::info!(
            "Landmarker subprocess started (pid: {:?}, camera: {}, {}x{}, port: {})",
            child.id(),
            self.camera.device,
            self.camera.width,
            self.camera.height,
            self.detector.port,
        );

        self.child = Some(child);
        Ok(())
    }

    /// Check if the subprocess is still running (non-blocking)
    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    tracing::warn!("Landmarker subprocess exited with: {}", status);
                    self.child = None;
                    false
                }
                Err(e) => {
                    tracing::error!("Failed to check landmarker subprocess status: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Stop the subprocess by killing it
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!("Stopping landmarker subprocess (pid: {:?})", child.id());
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_args_carry_camera_and_options() {
        let sp = LandmarkerSubprocess::new(&DetectorConfig::default(), &CameraConfig::default());
        let args = sp.args();

        assert_eq!(args[0], "scripts/landmark_feed.py");
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--width") + 1], "640");
        assert_eq!(args[pos("--height") + 1], "480");
        assert_eq!(args[pos("--delegate") + 1], "GPU");
        assert_eq!(args[pos("--running-mode") + 1], "VIDEO");
        assert!(args.contains(&"--blendshapes".to_string()));
        assert!(args.contains(&"--transformation-matrixes".to_string()));
    }

    #[test]
    fn test_not_running_before_start() {
        let mut sp = LandmarkerSubprocess::new(&DetectorConfig::default(), &CameraConfig::default());
        assert!(!sp.is_running());
    }

    #[tokio::test]
    async fn test_chatty_helper_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("done");
        let script = dir.path().join("chatty.py");
        std::fs::write(
            &script,
            format!(
                "import sys, time\n\
                 for i in range(4000):\n\
                 \x20   sys.stderr.write('I0000 landmarker.cc:42] frame %06d processed ok\\n' % i)\n\
                 sys.stderr.flush()\n\
                 open({:?}, 'w').close()\n\
                 time.sleep(30)\n",
                marker.display().to_string()
            ),
        )
        .unwrap();

        let detector = DetectorConfig {
            helper_script: script.display().to_string(),
            ..DetectorConfig::default()
        };
        let mut sp = LandmarkerSubprocess::new(&detector, &CameraConfig::default());
        sp.start().unwrap();

        let mut finished = false;
        for _ in 0..100 {
            if marker.exists() {
                finished = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert!(finished, "helper blocked writing to stderr");
        assert!(sp.is_running());
        sp.stop().await;
        assert!(!sp.is_running());
    }
}
