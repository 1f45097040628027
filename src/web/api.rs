//! REST API endpoints

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::config::BindingProfile;
use crate::output::sse;
use crate::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub tracking_active: bool,
    pub face_tracked: bool,
    pub body_tracked: bool,
    pub frame: u64,
    pub profile: BindingProfile,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pose = state.get_pose().await;
    let profile = state.config.read().await.binder.profile;

    ApiResponse::success(StatusResponse {
        version: crate::VERSION.to_string(),
        tracking_active: state.is_tracking_active(),
        face_tracked: pose.face_tracked,
        body_tracked: pose.body_tracked,
        frame: pose.frame,
        profile,
    })
}

/// Get the latest avatar pose
pub async fn get_pose(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ApiResponse::success(state.get_pose().await)
}

/// Avatar asset and placement for the renderer
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub model_path: String,
    pub position: [f32; 3],
}

/// Get the avatar asset description
pub async fn get_avatar(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().await;

    ApiResponse::success(AvatarResponse {
        model_path: config.avatar.model_path.display().to_string(),
        position: config.avatar.position,
    })
}

/// SSE stream of pose updates
pub async fn pose_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_pose_stream(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_response_omits_empty_fields() {
        let Json(resp) = ApiResponse::success(42u32);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_status_reflects_pose() {
        let state = AppState::new(Config::default());
        state.set_tracking_active(true);

        let response = get_status(State(state)).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
