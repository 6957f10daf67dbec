//! Video handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use watchfleet_core::{Video, VideoId};

use crate::http::responses::{ApiError, EnqueueVideoRequest, TaskResponse};
use crate::scheduler::{Scheduler, SchedulerError, VideoProgress};

/// Queue a video for watching.
pub async fn enqueue_video(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<EnqueueVideoRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let video = Video::from_listing(req.listing).map_err(SchedulerError::from)?;
    info!(video_id = %video.id, "Enqueue requested over HTTP");
    let task = scheduler
        .enqueue_with_priority(video, req.task_priority)
        .await?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(&task))))
}

/// Task tallies for one video.
pub async fn video_progress(
    State(scheduler): State<Arc<Scheduler>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoProgress>, ApiError> {
    let video_id = VideoId::new(video_id);
    scheduler
        .video_progress(&video_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Video not found: {video_id}")))
}
