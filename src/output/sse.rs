//! Server-Sent Events for real-time pose updates

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::avatar::SkeletonPose;
use crate::AppState;

/// Create an SSE stream of avatar poses
pub fn create_pose_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app_state.subscribe_pose();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(pose) => pose_to_event(&pose).map(Ok),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Convert a pose to an SSE event
fn pose_to_event(pose: &SkeletonPose) -> Option<Event> {
    match serde_json::to_string(pose) {
        Ok(data) => Some(Event::default().event("pose").data(data)),
        Err(e) => {
            tracing::warn!("Failed to serialize pose frame {}: {}", pose.frame, e);
            None
        }
    }
}
