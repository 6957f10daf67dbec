//! Status enums for Tasks, Devices, and Videos.
//!
//! Each enum owns its transition table so every mutation site goes through
//! the same exhaustive check.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Status of a Task in the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue for an idle device.
    #[default]
    Queued,
    /// Bound to a device, session not yet started.
    Assigned,
    /// A session is executing on the bound device.
    Running,
    /// Session finished successfully.
    Completed,
    /// Retry budget exhausted.
    Failed,
    /// Stopped by an operator or by scheduler shutdown.
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        Self::Queued,
        Self::Assigned,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Returns true if the task can never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the task is bound to a device.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Assigned | Self::Running)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Queued, Assigned | Cancelled) => true,
            (Assigned, Running | Queued | Cancelled) => true,
            (Running, Completed | Failed | Queued | Cancelled) => true,
            (Queued | Assigned | Running, _) => false,
            (Completed | Failed | Cancelled, _) => false,
        }
    }

    /// Validate a transition, producing a domain error on violation.
    pub fn transition(&self, next: TaskStatus) -> Result<TaskStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Assigned => "assigned",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Status of a Device in the fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Ready to accept a task.
    Idle,
    /// Holding exactly one running task.
    Busy,
    /// Not reachable (disconnected or heartbeat timed out).
    #[default]
    Offline,
    /// Faulted; needs an external recovery signal.
    Error,
    /// Battery temperature above the configured threshold.
    Overheat,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 5] = [
        Self::Idle,
        Self::Busy,
        Self::Offline,
        Self::Error,
        Self::Overheat,
    ];

    /// Returns true if the device can be handed a new task.
    pub fn can_accept_tasks(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn can_transition_to(&self, next: DeviceStatus) -> bool {
        use DeviceStatus::*;
        match (self, next) {
            // Disconnect is possible from anywhere.
            (_, Offline) => true,
            (Idle, Busy | Error | Overheat) => true,
            (Busy, Idle | Error | Overheat) => true,
            (Error, Idle | Overheat) => true,
            (Overheat, Idle | Error) => true,
            // Reconnect; busy when the device still holds its task.
            (Offline, Idle | Busy) => true,
            (Idle | Busy | Error | Overheat | Offline, _) => false,
        }
    }

    pub fn transition(&self, next: DeviceStatus) -> Result<DeviceStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Offline => "offline",
            Self::Error => "error",
            Self::Overheat => "overheat",
        }
    }
}

/// Processing status of a Video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl VideoStatus {
    pub const ALL: [VideoStatus; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_task_states_are_sticky() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            for next in TaskStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{:?} -> {:?}", terminal, next);
            }
        }
    }

    #[test]
    fn test_running_task_can_requeue_for_retry() {
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Queued));
        assert!(TaskStatus::Queued.transition(TaskStatus::Completed).is_err());
    }

    #[test]
    fn test_device_offline_reachable_from_everywhere() {
        for status in DeviceStatus::ALL {
            assert!(status.can_transition_to(DeviceStatus::Offline));
        }
    }

    #[test]
    fn test_faulted_device_cannot_become_busy() {
        assert!(!DeviceStatus::Error.can_transition_to(DeviceStatus::Busy));
        assert!(!DeviceStatus::Overheat.can_transition_to(DeviceStatus::Busy));
        assert!(DeviceStatus::Idle.can_transition_to(DeviceStatus::Busy));
    }

    #[test]
    fn test_reconnect_may_resume_busy() {
        assert!(DeviceStatus::Offline.can_transition_to(DeviceStatus::Busy));
        assert!(DeviceStatus::Offline.can_transition_to(DeviceStatus::Idle));
        assert!(!DeviceStatus::Offline.can_transition_to(DeviceStatus::Error));
    }

    #[test]
    fn test_invalid_transition_error_names_states() {
        let err = DeviceStatus::Error
            .transition(DeviceStatus::Busy)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid state transition: error -> busy");
    }
}
