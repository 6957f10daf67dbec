//! Scheduler start/stop handlers.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::http::responses::SchedulerStateResponse;
use crate::scheduler::Scheduler;

pub async fn start_scheduler(
    State(scheduler): State<Arc<Scheduler>>,
) -> Json<SchedulerStateResponse> {
    let changed = scheduler.start().await;
    Json(SchedulerStateResponse {
        running: true,
        changed,
    })
}

/// Stop dispatching. Returns once every running session has unwound.
pub async fn stop_scheduler(
    State(scheduler): State<Arc<Scheduler>>,
) -> Json<SchedulerStateResponse> {
    let changed = scheduler.stop().await;
    Json(SchedulerStateResponse {
        running: false,
        changed,
    })
}
