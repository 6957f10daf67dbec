//! Status snapshot handler.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::scheduler::Scheduler;

/// Task, device and video counts plus session stats.
pub async fn get_status(State(scheduler): State<Arc<Scheduler>>) -> impl IntoResponse {
    Json(scheduler.snapshot().await)
}
