//! Device handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use watchfleet_core::{DeviceHealth, DeviceId};

use crate::http::responses::{
    ApiError, DeviceListQuery, DeviceResponse, FaultRequest, RegisterDeviceRequest,
};
use crate::scheduler::Scheduler;

/// List devices as JSON, sorted by serial. `?pc_id=` narrows to one host PC.
pub async fn list_devices(
    State(scheduler): State<Arc<Scheduler>>,
    Query(query): Query<DeviceListQuery>,
) -> Json<Vec<DeviceResponse>> {
    let devices = match &query.pc_id {
        Some(pc_id) => scheduler.state().fleet.list_by_pc(pc_id).await,
        None => scheduler.list_devices().await,
    };
    Json(devices.iter().map(DeviceResponse::from).collect())
}

/// Register a device, or refresh the one with the same serial.
pub async fn register_device(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<(StatusCode, Json<DeviceResponse>), ApiError> {
    if req.serial.trim().is_empty() {
        return Err(ApiError::bad_request("serial must not be empty"));
    }
    let device = scheduler
        .state()
        .fleet
        .register(&req.serial, &req.model, &req.pc_id)
        .await?;
    Ok((StatusCode::CREATED, Json(DeviceResponse::from(&device))))
}

/// Store a telemetry sample from the health poller.
pub async fn device_heartbeat(
    State(scheduler): State<Arc<Scheduler>>,
    Path(device_id): Path<String>,
    Json(health): Json<DeviceHealth>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = scheduler
        .state()
        .fleet
        .record_heartbeat(&DeviceId::new(device_id), &health)
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}

/// Return a faulted device to the pool.
pub async fn recover_device(
    State(scheduler): State<Arc<Scheduler>>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = scheduler
        .state()
        .fleet
        .recover(&DeviceId::new(device_id))
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}

/// Take a device out of the pool until it is recovered.
pub async fn report_fault(
    State(scheduler): State<Arc<Scheduler>>,
    Path(device_id): Path<String>,
    Json(req): Json<FaultRequest>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let reason = if req.reason.is_empty() {
        "reported fault"
    } else {
        req.reason.as_str()
    };
    let device = scheduler
        .state()
        .fleet
        .report_fault(&DeviceId::new(device_id), reason)
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}

pub async fn disconnect_device(
    State(scheduler): State<Arc<Scheduler>>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = scheduler
        .state()
        .fleet
        .disconnect(&DeviceId::new(device_id))
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}

/// Forget a device. Refused with 409 while it runs a task.
pub async fn remove_device(
    State(scheduler): State<Arc<Scheduler>>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = scheduler
        .state()
        .fleet
        .remove(&DeviceId::new(device_id))
        .await?;
    Ok(Json(DeviceResponse::from(&device)))
}
