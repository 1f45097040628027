//! Error types for avatar-mirror

use thiserror::Error;

/// Main error type for avatar-mirror
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Avatar error: {0}")]
    Avatar(#[from] AvatarError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Avatar asset and skeleton errors
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Failed to load avatar asset: {0}")]
    Load(String),

    #[error("Avatar asset has no node named '{0}'")]
    MissingBone(String),
}

/// Landmark detection and camera errors
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Could not access the camera: {0}")]
    CameraUnavailable(String),

    #[error("Landmark receiver error: {0}")]
    Receiver(String),

    #[error("Landmarker subprocess error: {0}")]
    Subprocess(String),

    #[error("Timestamp {current}ms is not after previous {previous}ms")]
    NonMonotonicTimestamp { previous: f64, current: f64 },

    #[error("Landmarker running mode {0} does not accept video frames")]
    UnsupportedRunningMode(String),
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Result type alias for avatar-mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;
