//! HTTP server for the control plane.
//!
//! Provides endpoints for:
//! - Status snapshot (`/v1/status`)
//! - Task list and cancellation (`/v1/tasks`)
//! - Device registration, heartbeats, faults and recovery (`/v1/devices`)
//! - Manual enqueue and per-video progress (`/v1/videos`)
//! - Scheduler start/stop (`/v1/scheduler`)
//! - Pattern generation and calibration (`/v1/patterns`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::scheduler::Scheduler;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(scheduler: Arc<Scheduler>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/v1/status", get(handlers::get_status))
        .route("/v1/tasks", get(handlers::list_tasks))
        .route("/v1/tasks/:task_id/cancel", post(handlers::cancel_task))
        .route(
            "/v1/devices",
            get(handlers::list_devices).post(handlers::register_device),
        )
        .route(
            "/v1/devices/:device_id/heartbeat",
            post(handlers::device_heartbeat),
        )
        .route("/v1/devices/:device_id", delete(handlers::remove_device))
        .route(
            "/v1/devices/:device_id/recover",
            post(handlers::recover_device),
        )
        .route("/v1/devices/:device_id/fault", post(handlers::report_fault))
        .route(
            "/v1/devices/:device_id/disconnect",
            post(handlers::disconnect_device),
        )
        .route("/v1/videos", post(handlers::enqueue_video))
        .route(
            "/v1/videos/:video_id/progress",
            get(handlers::video_progress),
        )
        .route("/v1/scheduler/start", post(handlers::start_scheduler))
        .route("/v1/scheduler/stop", post(handlers::stop_scheduler))
        // Pattern routes
        .route("/v1/patterns/generate", post(handlers::generate_pattern))
        .route("/v1/patterns/watch", post(handlers::watch_pattern))
        .route("/v1/patterns/interaction", post(handlers::interaction_pattern))
        .route("/v1/patterns/tap", post(handlers::tap))
        .route("/v1/patterns/double-tap", post(handlers::double_tap))
        .route("/v1/patterns/long-press", post(handlers::long_press))
        .route("/v1/patterns/tap-sequence", post(handlers::tap_sequence))
        .route("/v1/patterns/swipe", post(handlers::swipe))
        .route("/v1/patterns/scroll", post(handlers::scroll))
        .route("/v1/patterns/seek", post(handlers::seek))
        .route("/v1/patterns/typing", post(handlers::typing))
        .route("/v1/patterns/shorts-timing", get(handlers::shorts_timing))
        .route(
            "/v1/patterns/stats/watch-distribution",
            get(handlers::watch_distribution),
        )
        .route(
            "/v1/patterns/stats/interaction-rates",
            get(handlers::interaction_rates),
        )
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(scheduler)
}
