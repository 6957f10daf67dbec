//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use watchfleet_core::{SearchType, SessionResult, Task, TaskId, Video, VideoId};

use crate::config::Config;
use crate::fleet::DeviceFleetManager;

/// Running tallies over finished attempts.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub completed: u64,
    pub failed_attempts: u64,
    pub cancelled: u64,
    pub total_watch_secs: u64,
    watch_percent_sum: f64,
    pub likes: u64,
    pub comments: u64,
    /// Successful discoveries per search type, indexed by `code - 1`.
    search_types: [u64; 4],
    rank_sum: u64,
    ranked: u64,
}

impl SessionStats {
    pub fn record_success(&mut self, result: &SessionResult) {
        self.completed += 1;
        self.total_watch_secs += result.watch_time as u64;
        self.watch_percent_sum += result.watch_percent();
        self.likes += result.liked as u64;
        self.comments += result.commented as u64;
        if let Some(search_type) = result.search_type {
            self.search_types[search_type.code() as usize - 1] += 1;
            if result.search_rank > 0 {
                self.rank_sum += result.search_rank as u64;
                self.ranked += 1;
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.failed_attempts += 1;
    }

    pub fn record_cancelled(&mut self) {
        self.cancelled += 1;
    }

    pub fn summary(&self) -> StatsSummary {
        let per_session = |n: u64| {
            if self.completed == 0 {
                0.0
            } else {
                n as f64 / self.completed as f64
            }
        };
        StatsSummary {
            completed: self.completed,
            failed_attempts: self.failed_attempts,
            cancelled: self.cancelled,
            total_attempts: self.completed + self.failed_attempts,
            total_watch_secs: self.total_watch_secs,
            average_watch_percent: if self.completed == 0 {
                0.0
            } else {
                self.watch_percent_sum / self.completed as f64
            },
            like_rate: per_session(self.likes),
            comment_rate: per_session(self.comments),
            search_types: SearchType::ALL
                .iter()
                .map(|t| SearchTypeCount {
                    search_type: t.as_str(),
                    code: t.code(),
                    count: self.search_types[t.code() as usize - 1],
                })
                .collect(),
            average_rank: (self.ranked > 0).then(|| self.rank_sum as f64 / self.ranked as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchTypeCount {
    pub search_type: &'static str,
    pub code: u8,
    pub count: u64,
}

/// Aggregated session statistics for the status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub completed: u64,
    pub failed_attempts: u64,
    pub cancelled: u64,
    pub total_attempts: u64,
    pub total_watch_secs: u64,
    pub average_watch_percent: f64,
    pub like_rate: f64,
    pub comment_rate: f64,
    pub search_types: Vec<SearchTypeCount>,
    /// Mean 1-based rank over search-based discoveries.
    pub average_rank: Option<f64>,
}

/// Shared application state.
///
/// Lock order when more than one is held: tasks, fleet, videos, running,
/// stats.
pub struct AppState {
    /// Device records and their status machine.
    pub fleet: DeviceFleetManager,

    /// Tasks indexed by TaskId.
    pub tasks: RwLock<HashMap<TaskId, Task>>,

    /// Videos indexed by VideoId.
    pub videos: RwLock<HashMap<VideoId, Video>>,

    /// Cancellation handles of running tasks.
    pub running: RwLock<HashMap<TaskId, CancellationToken>>,

    pub stats: RwLock<SessionStats>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            fleet: DeviceFleetManager::new(config.overheat_temp_c, config.heartbeat_timeout()),
            tasks: RwLock::new(HashMap::new()),
            videos: RwLock::new(HashMap::new()),
            running: RwLock::new(HashMap::new()),
            stats: RwLock::new(SessionStats::default()),
        })
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn video_count(&self) -> usize {
        self.videos.read().await.len()
    }
}
