//! avatar-mirror - live face and body tracking onto a rigged 3D avatar
//!
//! - Polls MediaPipe face/pose landmarker results once per display refresh
//! - Maps limb segments and the face transform to bone rotations
//! - Publishes the avatar pose over HTTP/SSE for an external renderer

pub mod avatar;
pub mod config;
pub mod driver;
pub mod error;
pub mod output;
pub mod rig;
pub mod session;
pub mod tracking;
pub mod web;

pub use config::Config;
pub use error::{MirrorError, Result};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use avatar::SkeletonPose;

/// Application state shared between the tracking loop and the HTTP surface
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Latest published avatar pose
    pub pose: RwLock<SkeletonPose>,
    /// Channel for pose updates
    pub pose_tx: broadcast::Sender<SkeletonPose>,
    /// Shutdown signal
    pub shutdown_tx: broadcast::Sender<()>,
    /// Whether the landmark feed is delivering frames
    pub tracking_active: AtomicBool,
}

impl AppState {
    /// Create a new application state with the given configuration
    pub fn new(config: Config) -> Arc<Self> {
        let (pose_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            config: RwLock::new(config),
            pose: RwLock::new(SkeletonPose::default()),
            pose_tx,
            shutdown_tx,
            tracking_active: AtomicBool::new(false),
        })
    }

    /// Store the pose and broadcast it
    pub async fn publish_pose(&self, pose: SkeletonPose) {
        let mut current = self.pose.write().await;
        *current = pose.clone();
        let _ = self.pose_tx.send(pose);
    }

    /// Get the latest pose
    pub async fn get_pose(&self) -> SkeletonPose {
        self.pose.read().await.clone()
    }

    /// Subscribe to pose updates
    pub fn subscribe_pose(&self) -> broadcast::Receiver<SkeletonPose> {
        self.pose_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn set_tracking_active(&self, active: bool) {
        self.tracking_active.store(active, Ordering::Relaxed);
    }

    pub fn is_tracking_active(&self) -> bool {
        self.tracking_active.load(Ordering::Relaxed)
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_pose_broadcasts() {
        let state = AppState::new(Config::default());
        let mut rx = state.subscribe_pose();

        let pose = SkeletonPose {
            frame: 3,
            body_tracked: true,
            ..SkeletonPose::default()
        };
        state.publish_pose(pose.clone()).await;

        assert_eq!(rx.recv().await.unwrap(), pose);
        assert_eq!(state.get_pose().await.frame, 3);
    }

    #[test]
    fn test_tracking_flag() {
        let state = AppState::new(Config::default());
        assert!(!state.is_tracking_active());
        state.set_tracking_active(true);
        assert!(state.is_tracking_active());
    }
}
