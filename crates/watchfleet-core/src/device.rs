//! Device identity, telemetry and task counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, DeviceId, DeviceStatus};

/// Health telemetry reported by the external health poller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceHealth {
    /// Battery charge, 0-100.
    #[serde(default)]
    pub battery_level: Option<u8>,
    /// Battery temperature in degrees Celsius.
    #[serde(default)]
    pub battery_temp: Option<f32>,
    /// CPU usage, 0-100.
    #[serde(default)]
    pub cpu_usage: Option<f32>,
    /// Memory usage, 0-100.
    #[serde(default)]
    pub memory_usage: Option<f32>,
}

/// A remote-controlled device in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,

    /// Serial number as seen by the automation host.
    pub serial: String,

    /// Hardware model name.
    pub model: String,

    /// Host machine the device is attached to.
    pub pc_id: String,

    pub status: DeviceStatus,

    pub battery_level: u8,
    pub battery_temp: f32,
    pub cpu_usage: f32,
    pub memory_usage: f32,

    /// Attempts finished on this device.
    pub total_tasks: u64,

    /// Attempts that completed successfully. Never exceeds `total_tasks`.
    pub success_tasks: u64,

    /// Attempts that failed.
    pub error_tasks: u64,

    pub last_heartbeat: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

impl Device {
    /// Create a newly registered, idle Device.
    pub fn new(serial: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DeviceId::generate(),
            serial: serial.into(),
            model: model.into(),
            pc_id: String::new(),
            status: DeviceStatus::Idle,
            battery_level: 100,
            battery_temp: 0.0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            total_tasks: 0,
            success_tasks: 0,
            error_tasks: 0,
            last_heartbeat: Some(now),
            registered_at: now,
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: DeviceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_pc(mut self, pc_id: impl Into<String>) -> Self {
        self.pc_id = pc_id.into();
        self
    }

    /// Move to `next`, rejecting transitions the status table forbids.
    pub fn set_status(&mut self, next: DeviceStatus) -> Result<(), CoreError> {
        if self.status != next {
            self.status = self.status.transition(next)?;
        }
        Ok(())
    }

    /// Apply a telemetry sample. Missing fields keep their previous value.
    pub fn apply_health(&mut self, health: &DeviceHealth, at: DateTime<Utc>) {
        if let Some(level) = health.battery_level {
            self.battery_level = level.min(100);
        }
        if let Some(temp) = health.battery_temp {
            self.battery_temp = temp;
        }
        if let Some(cpu) = health.cpu_usage {
            self.cpu_usage = cpu.clamp(0.0, 100.0);
        }
        if let Some(mem) = health.memory_usage {
            self.memory_usage = mem.clamp(0.0, 100.0);
        }
        self.last_heartbeat = Some(at);
    }

    /// Count one finished attempt.
    pub fn record_attempt(&mut self, success: bool) {
        self.total_tasks += 1;
        if success {
            self.success_tasks += 1;
        } else {
            self.error_tasks += 1;
        }
    }

    /// Success rate in percent, `None` until the first attempt finishes.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_tasks == 0 {
            None
        } else {
            Some(self.success_tasks as f64 / self.total_tasks as f64 * 100.0)
        }
    }
}
