//! Device fleet manager.
//!
//! Owns every [`Device`] record, its telemetry and its status machine. Device
//! selection and the idle to busy transition happen under a single write lock,
//! so two execution contexts can never hold the same device.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use watchfleet_core::{CoreError, Device, DeviceHealth, DeviceId, DeviceStatus, TaskId};

/// Fleet errors.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    #[error("No device available")]
    NoDeviceAvailable,

    #[error("Device {0} is running task {1}")]
    DeviceBusy(DeviceId, TaskId),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Fleet bookkeeping around a device record.
#[derive(Debug, Clone)]
struct DeviceEntry {
    device: Device,

    /// Task currently running on the device.
    running_task: Option<TaskId>,

    /// Not eligible before this instant (post-task cooldown).
    available_at: Option<Instant>,
}

impl DeviceEntry {
    fn is_eligible(&self, now: Instant) -> bool {
        self.device.status.can_accept_tasks()
            && self.running_task.is_none()
            && self.available_at.map_or(true, |at| at <= now)
    }
}

/// Per-status device counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DeviceCounts {
    pub idle: usize,
    pub busy: usize,
    pub offline: usize,
    pub error: usize,
    pub overheat: usize,
}

impl DeviceCounts {
    pub fn total(&self) -> usize {
        self.idle + self.busy + self.offline + self.error + self.overheat
    }

    fn add(&mut self, status: DeviceStatus) {
        match status {
            DeviceStatus::Idle => self.idle += 1,
            DeviceStatus::Busy => self.busy += 1,
            DeviceStatus::Offline => self.offline += 1,
            DeviceStatus::Error => self.error += 1,
            DeviceStatus::Overheat => self.overheat += 1,
        }
    }
}

/// Tracks device identity, telemetry and status.
pub struct DeviceFleetManager {
    devices: RwLock<HashMap<DeviceId, DeviceEntry>>,
    overheat_temp_c: f32,
    heartbeat_timeout: Duration,
}

impl DeviceFleetManager {
    pub fn new(overheat_temp_c: f32, heartbeat_timeout: Duration) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            overheat_temp_c,
            heartbeat_timeout,
        }
    }

    /// Register a device, or refresh an existing one with the same serial.
    pub async fn register(
        &self,
        serial: &str,
        model: &str,
        pc_id: &str,
    ) -> Result<Device, FleetError> {
        let mut devices = self.devices.write().await;

        if let Some(entry) = devices.values_mut().find(|e| e.device.serial == serial) {
            entry.device.model = model.to_string();
            entry.device.pc_id = pc_id.to_string();
            entry.device.last_heartbeat = Some(Utc::now());
            if entry.running_task.is_none() {
                entry.device.set_status(DeviceStatus::Idle)?;
            }
            info!(device_id = %entry.device.id, serial = %serial, "Device re-registered");
            return Ok(entry.device.clone());
        }

        let device = Device::new(serial, model).with_pc(pc_id);
        info!(device_id = %device.id, serial = %serial, pc_id = %pc_id, "Device registered");
        devices.insert(
            device.id.clone(),
            DeviceEntry {
                device: device.clone(),
                running_task: None,
                available_at: None,
            },
        );
        Ok(device)
    }

    pub async fn get(&self, id: &DeviceId) -> Option<Device> {
        self.devices.read().await.get(id).map(|e| e.device.clone())
    }

    /// All devices, sorted by serial.
    pub async fn list(&self) -> Vec<Device> {
        let devices = self.devices.read().await;
        let mut list: Vec<Device> = devices.values().map(|e| e.device.clone()).collect();
        list.sort_by(|a, b| a.serial.cmp(&b.serial));
        list
    }

    /// Devices attached to one host PC.
    pub async fn list_by_pc(&self, pc_id: &str) -> Vec<Device> {
        self.list()
            .await
            .into_iter()
            .filter(|d| d.pc_id == pc_id)
            .collect()
    }

    pub async fn counts(&self) -> DeviceCounts {
        let devices = self.devices.read().await;
        let mut counts = DeviceCounts::default();
        for entry in devices.values() {
            counts.add(entry.device.status);
        }
        counts
    }

    /// Whether any device could take a task at `now`.
    pub async fn has_eligible(&self, now: Instant) -> bool {
        self.devices.read().await.values().any(|e| e.is_eligible(now))
    }

    /// Pick an eligible device and bind `task_id` to it, marking it busy.
    ///
    /// Selection and the status change happen under one write lock.
    pub async fn select_eligible_device(
        &self,
        task_id: &TaskId,
        now: Instant,
    ) -> Result<Device, FleetError> {
        let mut devices = self.devices.write().await;

        // Least-used first, ties by serial.
        let entry = devices
            .values_mut()
            .filter(|e| e.is_eligible(now))
            .min_by(|a, b| {
                a.device
                    .total_tasks
                    .cmp(&b.device.total_tasks)
                    .then_with(|| a.device.serial.cmp(&b.device.serial))
            })
            .ok_or(FleetError::NoDeviceAvailable)?;

        entry.device.set_status(DeviceStatus::Busy)?;
        entry.running_task = Some(task_id.clone());
        entry.available_at = None;
        Ok(entry.device.clone())
    }

    /// Detach the running task from a device.
    ///
    /// `success` is `None` for cancelled attempts, which are not counted. A
    /// busy device returns to idle; a faulted or offline one keeps its status
    /// until recovery is reported. The device stays out of the pool for
    /// `cooldown`.
    pub async fn release(
        &self,
        id: &DeviceId,
        success: Option<bool>,
        cooldown: Duration,
        now: Instant,
    ) -> Result<Device, FleetError> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(id)
            .ok_or_else(|| FleetError::DeviceNotFound(id.clone()))?;

        if let Some(success) = success {
            entry.device.record_attempt(success);
        }
        entry.running_task = None;
        entry.available_at = Some(now + cooldown);
        if entry.device.status == DeviceStatus::Busy {
            entry.device.set_status(DeviceStatus::Idle)?;
        }
        Ok(entry.device.clone())
    }

    /// Store a telemetry sample and classify overheat.
    pub async fn record_heartbeat(
        &self,
        id: &DeviceId,
        health: &DeviceHealth,
    ) -> Result<Device, FleetError> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(id)
            .ok_or_else(|| FleetError::DeviceNotFound(id.clone()))?;

        entry.device.apply_health(health, Utc::now());
        let hot = entry.device.battery_temp >= self.overheat_temp_c;

        match entry.device.status {
            DeviceStatus::Idle | DeviceStatus::Busy | DeviceStatus::Error if hot => {
                warn!(
                    device_id = %id,
                    battery_temp = entry.device.battery_temp,
                    "Device overheating"
                );
                entry.device.set_status(DeviceStatus::Overheat)?;
            }
            DeviceStatus::Overheat if !hot && entry.running_task.is_none() => {
                info!(device_id = %id, battery_temp = entry.device.battery_temp, "Device cooled down");
                entry.device.set_status(DeviceStatus::Idle)?;
            }
            DeviceStatus::Offline => {
                let resumed = if entry.running_task.is_some() {
                    DeviceStatus::Busy
                } else {
                    DeviceStatus::Idle
                };
                entry.device.set_status(resumed)?;
                if hot {
                    entry.device.set_status(DeviceStatus::Overheat)?;
                }
                info!(device_id = %id, "Device back online");
            }
            _ => {}
        }
        Ok(entry.device.clone())
    }

    /// Mark devices whose last heartbeat is older than the timeout offline.
    pub async fn sweep_stale(&self, now: DateTime<Utc>) -> Vec<DeviceId> {
        let timeout = chrono::Duration::from_std(self.heartbeat_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let mut devices = self.devices.write().await;
        let mut stale = Vec::new();

        for entry in devices.values_mut() {
            if entry.device.status == DeviceStatus::Offline {
                continue;
            }
            let expired = entry
                .device
                .last_heartbeat
                .map_or(true, |at| now.signed_duration_since(at) > timeout);
            if expired && entry.device.set_status(DeviceStatus::Offline).is_ok() {
                warn!(device_id = %entry.device.id, "Device heartbeat timed out");
                stale.push(entry.device.id.clone());
            }
        }
        stale
    }

    /// Flag a device as faulted. It leaves the pool until recovered.
    pub async fn report_fault(&self, id: &DeviceId, reason: &str) -> Result<Device, FleetError> {
        self.transition(id, DeviceStatus::Error, Some(reason)).await
    }

    /// Return a faulted, overheated or offline device to the pool.
    pub async fn recover(&self, id: &DeviceId) -> Result<Device, FleetError> {
        {
            let devices = self.devices.read().await;
            let entry = devices
                .get(id)
                .ok_or_else(|| FleetError::DeviceNotFound(id.clone()))?;
            if let Some(task_id) = &entry.running_task {
                return Err(FleetError::DeviceBusy(id.clone(), task_id.clone()));
            }
        }
        self.transition(id, DeviceStatus::Idle, None).await
    }

    /// Mark a device offline.
    pub async fn disconnect(&self, id: &DeviceId) -> Result<Device, FleetError> {
        self.transition(id, DeviceStatus::Offline, None).await
    }

    /// Forget a device. Refused while it runs a task.
    pub async fn remove(&self, id: &DeviceId) -> Result<Device, FleetError> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get(id)
            .ok_or_else(|| FleetError::DeviceNotFound(id.clone()))?;
        if let Some(task_id) = &entry.running_task {
            return Err(FleetError::DeviceBusy(id.clone(), task_id.clone()));
        }
        let entry = devices
            .remove(id)
            .ok_or_else(|| FleetError::DeviceNotFound(id.clone()))?;
        info!(device_id = %id, "Device removed");
        Ok(entry.device)
    }

    async fn transition(
        &self,
        id: &DeviceId,
        next: DeviceStatus,
        reason: Option<&str>,
    ) -> Result<Device, FleetError> {
        let mut devices = self.devices.write().await;
        let entry = devices
            .get_mut(id)
            .ok_or_else(|| FleetError::DeviceNotFound(id.clone()))?;
        let from = entry.device.status;
        entry.device.set_status(next)?;
        info!(
            device_id = %id,
            from = from.as_str(),
            to = next.as_str(),
            reason = reason.unwrap_or(""),
            "Device status changed"
        );
        Ok(entry.device.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> DeviceFleetManager {
        DeviceFleetManager::new(70.0, Duration::from_secs(60))
    }

    fn hot(temp: f32) -> DeviceHealth {
        DeviceHealth {
            battery_temp: Some(temp),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_dedupes_by_serial() {
        let fleet = fleet();
        let a = fleet.register("R58M", "SM-G991", "pc-1").await.unwrap();
        fleet.disconnect(&a.id).await.unwrap();
        let b = fleet.register("R58M", "SM-G991", "pc-2").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.status, DeviceStatus::Idle);
        assert_eq!(b.pc_id, "pc-2");
        assert_eq!(fleet.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_select_never_double_assigns() {
        let fleet = fleet();
        fleet.register("s1", "m", "pc").await.unwrap();
        let now = Instant::now();

        let first = fleet
            .select_eligible_device(&TaskId::new("t1"), now)
            .await
            .unwrap();
        assert_eq!(first.status, DeviceStatus::Busy);
        let second = fleet.select_eligible_device(&TaskId::new("t2"), now).await;
        assert!(matches!(second, Err(FleetError::NoDeviceAvailable)));
    }

    #[tokio::test]
    async fn test_release_counts_and_cooldown() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();
        let now = Instant::now();
        fleet.select_eligible_device(&TaskId::new("t1"), now).await.unwrap();

        let released = fleet
            .release(&device.id, Some(true), Duration::from_secs(10), now)
            .await
            .unwrap();
        assert_eq!(released.status, DeviceStatus::Idle);
        assert_eq!(released.total_tasks, 1);
        assert_eq!(released.success_tasks, 1);

        assert!(!fleet.has_eligible(now + Duration::from_secs(5)).await);
        assert!(fleet.has_eligible(now + Duration::from_secs(10)).await);
    }

    #[tokio::test]
    async fn test_cancelled_release_not_counted() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();
        let now = Instant::now();
        fleet.select_eligible_device(&TaskId::new("t1"), now).await.unwrap();
        let released = fleet.release(&device.id, None, Duration::ZERO, now).await.unwrap();
        assert_eq!(released.total_tasks, 0);
        assert_eq!(released.status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_overheat_and_cooldown_recovery() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();

        let d = fleet.record_heartbeat(&device.id, &hot(72.5)).await.unwrap();
        assert_eq!(d.status, DeviceStatus::Overheat);
        assert!(!fleet.has_eligible(Instant::now()).await);

        let d = fleet.record_heartbeat(&device.id, &hot(41.0)).await.unwrap();
        assert_eq!(d.status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_fault_during_task_survives_release() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();
        let now = Instant::now();
        fleet.select_eligible_device(&TaskId::new("t1"), now).await.unwrap();

        fleet.report_fault(&device.id, "adb offline").await.unwrap();
        assert!(matches!(fleet.recover(&device.id).await, Err(FleetError::DeviceBusy(..))));

        let released = fleet.release(&device.id, Some(false), Duration::ZERO, now).await.unwrap();
        assert_eq!(released.status, DeviceStatus::Error);
        assert_eq!(released.error_tasks, 1);

        let recovered = fleet.recover(&device.id).await.unwrap();
        assert_eq!(recovered.status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_sweep_marks_stale_offline() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();
        let later = Utc::now() + chrono::Duration::seconds(61);
        assert_eq!(fleet.sweep_stale(later).await, vec![device.id.clone()]);
        assert_eq!(fleet.get(&device.id).await.unwrap().status, DeviceStatus::Offline);
        assert!(fleet.sweep_stale(later).await.is_empty());

        let back = fleet.record_heartbeat(&device.id, &hot(30.0)).await.unwrap();
        assert_eq!(back.status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_reconnect_mid_task_stays_busy() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();
        let now = Instant::now();
        fleet.select_eligible_device(&TaskId::new("t1"), now).await.unwrap();
        fleet.disconnect(&device.id).await.unwrap();

        let back = fleet
            .record_heartbeat(&device.id, &DeviceHealth::default())
            .await
            .unwrap();
        assert_eq!(back.status, DeviceStatus::Busy);
        assert_eq!(fleet.counts().await.busy, 1);
        assert!(!fleet.has_eligible(now).await);

        let released = fleet
            .release(&device.id, Some(false), Duration::ZERO, now)
            .await
            .unwrap();
        assert_eq!(released.status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn test_counts_and_pc_listing() {
        let fleet = fleet();
        fleet.register("a", "m", "pc-1").await.unwrap();
        let b = fleet.register("b", "m", "pc-2").await.unwrap();
        fleet.register("c", "m", "pc-1").await.unwrap();
        fleet.disconnect(&b.id).await.unwrap();

        let counts = fleet.counts().await;
        assert_eq!(counts.idle, 2);
        assert_eq!(counts.offline, 1);
        assert_eq!(counts.total(), 3);
        assert_eq!(fleet.list_by_pc("pc-1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_refused_while_running() {
        let fleet = fleet();
        let device = fleet.register("s1", "m", "pc").await.unwrap();
        fleet
            .select_eligible_device(&TaskId::new("t1"), Instant::now())
            .await
            .unwrap();
        assert!(fleet.remove(&device.id).await.is_err());
        fleet
            .release(&device.id, Some(true), Duration::ZERO, Instant::now())
            .await
            .unwrap();
        assert!(fleet.remove(&device.id).await.is_ok());
        assert!(fleet.get(&device.id).await.is_none());
    }
}
