//! WatchFleet Control Plane Library
//!
//! This crate provides the control plane for a fleet of video-watching
//! devices: the device pool, the discovery and session drivers, task
//! scheduling and the HTTP API.

pub mod actuator;
pub mod boundary;
pub mod config;
pub mod discovery;
pub mod fleet;
pub mod gestures;
pub mod http;
pub mod metrics;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use scheduler::Scheduler;
pub use state::AppState;
