//! WatchFleet Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Storage
//! - Runtime specifics
//!
//! Videos, devices, tasks and the per-attempt result record all live here,
//! together with the closed status enumerations that govern their lifecycles.

pub mod device;
pub mod error;
pub mod ids;
pub mod result;
pub mod status;
pub mod task;
pub mod video;

// Re-export commonly used types
pub use device::{Device, DeviceHealth};
pub use error::CoreError;
pub use ids::{DeviceId, TaskId, VideoId};
pub use result::{ResultStatus, SearchType, SessionResult};
pub use status::{DeviceStatus, TaskStatus, VideoStatus};
pub use task::Task;
pub use video::{Video, VideoListing};
