//! Control plane configuration.
//!
//! Every tunable lives here: retry budget, backoffs, scroll-page budgets,
//! decoy probability, screen geometry, health thresholds and the pattern
//! engine tables. Missing fields in the JSON file fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use watchfleet_pattern::{PatternConfig, PatternError, ScreenSize};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Control plane configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP API bind address.
    pub http_bind_addr: String,

    /// Aggregator base URL. Without it the queue is only fed through the API
    /// and results are kept locally.
    pub aggregator_url: Option<String>,

    /// Bearer key for the aggregator.
    pub aggregator_api_key: Option<String>,

    /// Device automation host base URL.
    pub automation_host_url: String,

    /// Start dispatching as soon as the server is up.
    pub autostart: bool,

    /// Seed for reproducible sessions. Entropy-seeded when absent.
    pub seed: Option<u64>,

    /// Failed attempts allowed before a task is permanently failed.
    pub max_retries: u32,

    /// Scheduler loop poll interval (milliseconds).
    pub tick_interval_ms: u64,

    /// Wait after a failed or empty queue refresh (seconds).
    pub refresh_backoff_secs: u64,

    /// Wait between result submission retries (seconds).
    pub report_backoff_secs: u64,

    /// Submission attempts per result before it is dropped.
    pub report_max_attempts: u32,

    /// Device cooldown after each attempt (seconds).
    pub inter_task_pause_min_secs: u64,
    pub inter_task_pause_max_secs: u64,

    /// Heartbeat timeout before a device is considered offline (seconds).
    pub heartbeat_timeout_secs: u64,

    /// Battery temperature at which a device is pulled from the pool.
    pub overheat_temp_c: f32,

    pub discovery: DiscoveryConfig,
    pub session: SessionConfig,
    pub pattern: PatternConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_addr: "0.0.0.0:8080".to_string(),
            aggregator_url: None,
            aggregator_api_key: None,
            automation_host_url: "http://127.0.0.1:7912".to_string(),
            autostart: true,
            seed: None,
            max_retries: 3,
            tick_interval_ms: 1000,
            refresh_backoff_secs: 60,
            report_backoff_secs: 60,
            report_max_attempts: 5,
            inter_task_pause_min_secs: 5,
            inter_task_pause_max_secs: 15,
            heartbeat_timeout_secs: 60,
            overheat_temp_c: 70.0,
            discovery: DiscoveryConfig::default(),
            session: SessionConfig::default(),
            pattern: PatternConfig::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file. Absent fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inter_task_pause_min_secs > self.inter_task_pause_max_secs {
            return Err(ConfigError::Invalid(
                "inter_task_pause_min_secs exceeds inter_task_pause_max_secs".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.session.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("session.poll_interval_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.discovery.decoy_probability) {
            return Err(ConfigError::Invalid("discovery.decoy_probability must be in [0, 1]".into()));
        }
        if self.discovery.decoy_min_secs > self.discovery.decoy_max_secs {
            return Err(ConfigError::Invalid("discovery.decoy_min_secs exceeds decoy_max_secs".into()));
        }
        self.pattern.validate()?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn refresh_backoff(&self) -> Duration {
        Duration::from_secs(self.refresh_backoff_secs)
    }

    pub fn report_backoff(&self) -> Duration {
        Duration::from_secs(self.report_backoff_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

/// Discovery tactic budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Result pages scanned by the keyword tactic.
    pub keyword_max_pages: u32,
    /// Result pages scanned by the recency-filtered keyword tactic.
    pub recent_max_pages: u32,
    /// Result pages scanned by the title tactic.
    pub title_max_pages: u32,
    /// Chance per scanned page of a decoy side-session.
    pub decoy_probability: f64,
    pub decoy_min_secs: u64,
    pub decoy_max_secs: u64,
    /// Element lookup timeout (milliseconds).
    pub element_timeout_ms: u64,
    /// Label of the upload-date filter option.
    pub recent_filter_label: String,
    /// Settle time after submitting a search or opening a URL (milliseconds).
    pub settle_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keyword_max_pages: 3,
            recent_max_pages: 3,
            title_max_pages: 1,
            decoy_probability: 0.05,
            decoy_min_secs: 5,
            decoy_max_secs: 60,
            element_timeout_ms: 5000,
            recent_filter_label: "Last hour".to_string(),
            settle_ms: 2000,
        }
    }
}

/// Session driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Package launched at the start of every session.
    pub app_package: String,
    /// Duration used when the player duration cannot be read (seconds).
    pub default_duration_secs: u32,
    /// Watch loop granularity (milliseconds).
    pub poll_interval_ms: u64,
    /// Wait after launching the app (milliseconds).
    pub launch_wait_ms: u64,
    /// Wait after opening the video (milliseconds).
    pub load_wait_ms: u64,
    pub screen: ScreenSize,
    /// Seek target centre as fractions of the screen.
    pub seek_x_ratio: f64,
    pub seek_y_ratio: f64,
    pub seek_box_width: i32,
    pub seek_box_height: i32,
    /// Capture a screenshot before leaving the video.
    pub capture_screenshot: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_package: "com.google.android.youtube".to_string(),
            default_duration_secs: 300,
            poll_interval_ms: 1000,
            launch_wait_ms: 3000,
            load_wait_ms: 2000,
            screen: ScreenSize::default(),
            seek_x_ratio: 0.75,
            seek_y_ratio: 0.4,
            seek_box_width: 200,
            seek_box_height: 400,
            capture_screenshot: true,
        }
    }
}
