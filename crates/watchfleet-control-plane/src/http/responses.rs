//! HTTP request and response types.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use watchfleet_core::{CoreError, Device, Task, VideoListing};
use watchfleet_pattern::{
    BoundingBox, HumanPattern, PatternError, Point, ScreenSize, SeekDirection,
};

use crate::fleet::FleetError;
use crate::scheduler::SchedulerError;

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn fleet_status(e: &FleetError) -> StatusCode {
    match e {
        FleetError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
        FleetError::NoDeviceAvailable => StatusCode::SERVICE_UNAVAILABLE,
        FleetError::DeviceBusy(..) | FleetError::Core(_) => StatusCode::CONFLICT,
    }
}

impl From<FleetError> for ApiError {
    fn from(e: FleetError) -> Self {
        Self {
            status: fleet_status(&e),
            message: e.to_string(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        let status = match &e {
            SchedulerError::TaskNotFound(_) | SchedulerError::VideoNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SchedulerError::DuplicateTask(_) | SchedulerError::AlreadyFinished(..) => {
                StatusCode::CONFLICT
            }
            SchedulerError::Core(CoreError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            SchedulerError::Core(_) => StatusCode::CONFLICT,
            SchedulerError::Source(_) => StatusCode::BAD_GATEWAY,
            SchedulerError::Fleet(fleet) => fleet_status(fleet),
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<PatternError> for ApiError {
    fn from(e: PatternError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

// ============================================================================
// Task types
// ============================================================================

/// Response for a single task.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub video_id: String,
    pub device_id: Option<String>,
    pub status: String,
    pub priority: u8,
    pub retry_count: u32,
    pub max_retries: u32,
    pub queued_at: String,
    pub finished_at: Option<String>,
    pub error_message: Option<String>,
}

impl From<&Task> for TaskResponse {
    fn from(t: &Task) -> Self {
        Self {
            task_id: t.id.to_string(),
            video_id: t.video_id.to_string(),
            device_id: t.device_id.as_ref().map(|d| d.to_string()),
            status: t.status.as_str().to_string(),
            priority: t.priority,
            retry_count: t.retry_count,
            max_retries: t.max_retries,
            queued_at: t.queued_at.to_rfc3339(),
            finished_at: t.finished_at.map(|at| at.to_rfc3339()),
            error_message: t.error_message.clone(),
        }
    }
}

/// Response for a cancel request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub task_id: String,
    /// `cancelled` for queued tasks; `running` while a session unwinds.
    pub status: String,
}

// ============================================================================
// Video types
// ============================================================================

/// Request body for the enqueue endpoint.
#[derive(Debug, Deserialize)]
pub struct EnqueueVideoRequest {
    #[serde(flatten)]
    pub listing: VideoListing,

    /// Task priority, overriding the video's.
    #[serde(default)]
    pub task_priority: Option<u8>,
}

// ============================================================================
// Device types
// ============================================================================

/// Request body for the device registration endpoint.
#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub serial: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub pc_id: String,
}

/// Query for the device list.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceListQuery {
    /// Only devices attached to this host PC.
    pub pc_id: Option<String>,
}

/// Request body for the fault endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FaultRequest {
    #[serde(default)]
    pub reason: String,
}

/// Response for a single device.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub device_id: String,
    pub serial: String,
    pub model: String,
    pub pc_id: String,
    pub status: String,
    pub battery_level: u8,
    pub battery_temp: f32,
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub total_tasks: u64,
    pub success_tasks: u64,
    pub error_tasks: u64,
    /// Percent, omitted until the first attempt finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    pub last_heartbeat: Option<String>,
}

impl From<&Device> for DeviceResponse {
    fn from(d: &Device) -> Self {
        Self {
            device_id: d.id.to_string(),
            serial: d.serial.clone(),
            model: d.model.clone(),
            pc_id: d.pc_id.clone(),
            status: d.status.as_str().to_string(),
            battery_level: d.battery_level,
            battery_temp: d.battery_temp,
            cpu_usage: d.cpu_usage,
            memory_usage: d.memory_usage,
            total_tasks: d.total_tasks,
            success_tasks: d.success_tasks,
            error_tasks: d.error_tasks,
            success_rate: d.success_rate(),
            last_heartbeat: d.last_heartbeat.map(|at| at.to_rfc3339()),
        }
    }
}

// ============================================================================
// Scheduler types
// ============================================================================

/// Response for start/stop requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct SchedulerStateResponse {
    pub running: bool,
    /// False when the scheduler was already in the requested state.
    pub changed: bool,
}

// ============================================================================
// Pattern types
// ============================================================================

/// Upper bound on simulation sample counts.
pub const MAX_SAMPLES: usize = 100_000;

fn default_duration() -> u32 {
    300
}

fn default_samples() -> usize {
    1000
}

fn default_press_ms() -> u32 {
    500
}

/// Request body for full and watch-only pattern generation.
#[derive(Debug, Deserialize)]
pub struct PatternRequest {
    /// Video duration in seconds.
    pub duration: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Generated session plan.
#[derive(Debug, Serialize)]
pub struct PatternResponse {
    pub pattern: HumanPattern,
    /// Seconds the session stays open to cover every scheduled action.
    pub session_length: u32,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub watch_time: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Request body for tap, double tap and long press.
#[derive(Debug, Deserialize)]
pub struct TouchRequest {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    /// Hold time for a long press.
    #[serde(default = "default_press_ms")]
    pub press_ms: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TapSequenceRequest {
    pub boxes: Vec<BoundingBox>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub start: Point,
    pub end: Point,
    /// Drawn from the configured range when absent.
    #[serde(default)]
    pub duration_ms: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Direction the content moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    #[default]
    Down,
    Up,
}

#[derive(Debug, Deserialize)]
pub struct ScrollRequest {
    #[serde(default)]
    pub screen: ScreenSize,
    #[serde(default)]
    pub direction: ScrollDirection,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    #[serde(default)]
    pub screen: ScreenSize,
    #[serde(default)]
    pub direction: SeekDirection,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub text: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Query carrying only an optional seed.
#[derive(Debug, Default, Deserialize)]
pub struct SeedQuery {
    pub seed: Option<u64>,
}

/// Shorts dwell draw.
#[derive(Debug, Serialize)]
pub struct ShortsTimingResponse {
    pub band: String,
    pub timing_seconds: f64,
}

#[derive(Debug, Deserialize)]
pub struct WatchDistributionQuery {
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_samples")]
    pub samples: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRatesQuery {
    #[serde(default = "default_duration")]
    pub watch_time: u32,
    #[serde(default = "default_samples")]
    pub samples: usize,
    pub seed: Option<u64>,
}
