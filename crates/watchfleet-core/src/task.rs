//! Task lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::video::{MAX_PRIORITY, MIN_PRIORITY};
use crate::{CoreError, DeviceId, TaskId, TaskStatus, Video, VideoId};

/// A Task is one request to watch a video, retried up to `max_retries` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,

    /// Video this task watches.
    pub video_id: VideoId,

    /// Device holding the task, if assigned.
    pub device_id: Option<DeviceId>,

    /// Current task status.
    pub status: TaskStatus,

    /// Copied from the video on enqueue, may be overridden.
    pub priority: u8,

    /// Failed attempts so far, 0..=max_retries.
    pub retry_count: u32,

    pub max_retries: u32,

    pub queued_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Error message from the most recent failed attempt.
    pub error_message: Option<String>,
}

impl Task {
    /// Create a queued Task for a video.
    pub fn new(video: &Video, max_retries: u32) -> Self {
        Self {
            id: TaskId::generate(),
            video_id: video.id.clone(),
            device_id: None,
            status: TaskStatus::Queued,
            priority: video.priority,
            retry_count: 0,
            max_retries,
            queued_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Override the inherited priority, clamped into 1-10.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Number of attempts started so far, including the running one.
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    fn move_to(&mut self, next: TaskStatus) -> Result<(), CoreError> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    /// Bind the task to a device.
    pub fn assign(&mut self, device_id: DeviceId) -> Result<(), CoreError> {
        self.move_to(TaskStatus::Assigned)?;
        self.device_id = Some(device_id);
        self.assigned_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the session as started.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.move_to(TaskStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the task as completed.
    pub fn complete(&mut self) -> Result<(), CoreError> {
        self.move_to(TaskStatus::Completed)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// Returns the new status: `Queued` while retries remain, `Failed` after.
    pub fn fail_attempt(&mut self, error: impl Into<String>) -> Result<TaskStatus, CoreError> {
        self.error_message = Some(error.into());
        if self.retry_count < self.max_retries {
            self.move_to(TaskStatus::Queued)?;
            self.retry_count += 1;
            self.device_id = None;
            self.queued_at = Utc::now();
        } else {
            self.move_to(TaskStatus::Failed)?;
            self.finished_at = Some(Utc::now());
        }
        Ok(self.status)
    }

    /// Mark the task as cancelled.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        self.move_to(TaskStatus::Cancelled)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}
