//! Configuration parsing and management for avatar-mirror

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, MirrorError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub driver: DriverConfig,
    pub binder: BinderConfig,
    pub avatar: AvatarConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MirrorError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, MirrorError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, MirrorError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(invalid("camera", "Capture resolution must be non-zero"));
        }

        if self.camera.fps == 0 {
            return Err(invalid("camera.fps", "Capture FPS must be greater than 0"));
        }

        if self.driver.frame_interval_ms.partial_cmp(&0.0) != Some(Ordering::Greater) {
            return Err(invalid(
                "driver.frame_interval_ms",
                "Frame interval must be greater than 0",
            ));
        }

        if self.driver.refresh_hz == 0 {
            return Err(invalid(
                "driver.refresh_hz",
                "Refresh rate must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.binder.visibility_threshold) {
            return Err(invalid(
                "binder.visibility_threshold",
                "Threshold must be between 0.0 and 1.0",
            ));
        }

        if self.detector.auto_launch {
            let path = Path::new(&self.detector.helper_script);
            if !path.exists() {
                tracing::warn!(
                    "Landmarker auto_launch enabled but helper script not found at: {}",
                    self.detector.helper_script
                );
            }
        }

        if self.http.port == 0 {
            return Err(invalid("http.port", "Port must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> MirrorError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Camera capture settings handed to the landmarker helper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub device: u32,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested capture FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Hardware acceleration preference for the landmark models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    #[default]
    Gpu,
    Cpu,
}

impl Delegate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpu => "GPU",
            Self::Cpu => "CPU",
        }
    }
}

/// How the landmarkers are fed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningMode {
    Image,
    /// Continuous video frames with increasing timestamps
    #[default]
    Video,
    LiveStream,
}

impl std::fmt::Display for RunningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "IMAGE"),
            Self::Video => write!(f, "VIDEO"),
            Self::LiveStream => write!(f, "LIVE_STREAM"),
        }
    }
}

/// Face/pose landmarker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// UDP port the helper streams results to
    pub port: u16,
    /// Listen address for the UDP socket
    pub listen_address: String,
    /// Auto-launch the landmarker helper subprocess
    pub auto_launch: bool,
    /// Path to the helper script
    pub helper_script: String,
    /// Auto-restart the helper on crash
    pub auto_restart: bool,
    /// Delay before restarting a crashed helper (seconds)
    pub restart_delay_secs: u64,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    /// Face landmarker model asset
    pub face_model: String,
    /// Pose landmarker model asset
    pub pose_model: String,
    pub output_face_blendshapes: bool,
    pub output_facial_transformation_matrixes: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            port: 12346,
            listen_address: "127.0.0.1".to_string(),
            auto_launch: false,
            helper_script: "scripts/landmark_feed.py".to_string(),
            auto_restart: true,
            restart_delay_secs: 3,
            delegate: Delegate::Gpu,
            running_mode: RunningMode::Video,
            face_model: "https://storage.googleapis.com/mediapipe-models/face_landmarker/face_landmarker/float16/1/face_landmarker.task".to_string(),
            pose_model: "https://storage.googleapis.com/mediapipe-models/pose_landmarker/pose_landmarker_lite/float16/1/pose_landmarker_lite.task".to_string(),
            output_face_blendshapes: true,
            output_facial_transformation_matrixes: true,
        }
    }
}

/// Frame driver timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Display refresh rate the driver ticks at
    pub refresh_hz: u32,
    /// Synthetic timestamp step per tick (ms), ~30 detections/second
    pub frame_interval_ms: f64,
    /// Keep the previous detection when a frame yields nothing
    pub retain_on_miss: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 60,
            frame_interval_ms: 33.3,
            retain_on_miss: false,
        }
    }
}

/// Which limb segments drive which bones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingProfile {
    /// Upper arm and forearm on both sides; lost-pose reset covers the same bones
    #[default]
    ArmChain,
    /// Historical mapping: right shoulder and right forearm both follow the
    /// shoulder-elbow segment, and the lost-pose reset set differs
    Classic,
}

impl std::str::FromStr for BindingProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm_chain" | "armchain" => Ok(Self::ArmChain),
            "classic" => Ok(Self::Classic),
            other => Err(format!("unknown binding profile '{}'", other)),
        }
    }
}

/// Avatar binder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    pub profile: BindingProfile,
    /// Both endpoint joints must be strictly above this to drive a bone
    pub visibility_threshold: f32,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            profile: BindingProfile::ArmChain,
            visibility_threshold: 0.5,
        }
    }
}

/// Avatar asset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Path to the glTF/GLB model
    pub model_path: PathBuf,
    /// Scene placement for the renderer
    pub position: [f32; 3],
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("Model.glb"),
            position: [0.0, -1.0, 3.0],
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("avatar-mirror");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/avatar-mirror");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/avatar-mirror");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("avatar-mirror");
        }
    }

    PathBuf::from(".")
}
