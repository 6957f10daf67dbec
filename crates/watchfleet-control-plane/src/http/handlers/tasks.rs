//! Task handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use watchfleet_core::TaskId;

use crate::http::responses::{ApiError, CancelResponse, TaskResponse};
use crate::scheduler::Scheduler;

/// List tasks as JSON, oldest first.
pub async fn list_tasks(State(scheduler): State<Arc<Scheduler>>) -> Json<Vec<TaskResponse>> {
    let tasks = scheduler.list_tasks().await;
    Json(tasks.iter().map(TaskResponse::from).collect())
}

/// Cancel a queued or running task.
pub async fn cancel_task(
    State(scheduler): State<Arc<Scheduler>>,
    Path(task_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let task_id = TaskId::new(task_id);
    let status = scheduler.cancel(&task_id).await?;
    Ok(Json(CancelResponse {
        task_id: task_id.into_inner(),
        status: status.as_str().to_string(),
    }))
}
