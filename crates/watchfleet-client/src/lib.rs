//! HTTP clients used by the WatchFleet control plane.
//!
//! [`AggregatorClient`] talks to the backend that supplies videos and
//! collects results; [`AutomationHostClient`] drives devices through their
//! automation host.

pub mod aggregator;
pub mod error;
pub mod host;

pub use aggregator::{AggregatorClient, VideoListResponse};
pub use error::ClientError;
pub use host::{AutomationHostClient, ElementHandle, Key, Selector, SelectorKind};
