//! Video records and the ingestion listing format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, VideoId, VideoStatus};

/// Lowest accepted priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted priority.
pub const MAX_PRIORITY: u8 = 10;
/// Priority applied when ingestion does not provide one.
pub const DEFAULT_PRIORITY: u8 = 5;

/// One entry of the ingestion listing, as delivered by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoListing {
    pub id: VideoId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// A video the fleet is asked to watch.
///
/// Created by ingestion, mutated by the scheduler on task lifecycle events,
/// never deleted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,

    /// Direct link, used by the last discovery tactic.
    pub url: Option<String>,

    /// Title matched against search results.
    pub title: String,

    /// Search keyword for the keyword tactics.
    pub keyword: String,

    /// Known duration in seconds, if ingestion supplied one.
    pub duration_secs: Option<u32>,

    /// Priority 1-10. Displayed, not used for dispatch ordering.
    pub priority: u8,

    pub status: VideoStatus,

    /// Number of completed sessions. Only ever increases.
    pub completed_count: u64,

    /// Number of failed attempts.
    pub error_count: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new pending Video.
    pub fn new(id: VideoId, title: impl Into<String>, keyword: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            url: None,
            title: title.into(),
            keyword: keyword.into(),
            duration_secs: None,
            priority: DEFAULT_PRIORITY,
            status: VideoStatus::Pending,
            completed_count: 0,
            error_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a Video from an ingestion listing, validating its fields.
    pub fn from_listing(listing: VideoListing) -> Result<Self, CoreError> {
        if listing.duration == Some(0) {
            return Err(CoreError::InvalidInput(format!(
                "video {} has zero duration",
                listing.id
            )));
        }
        let url = listing.url.filter(|u| !u.trim().is_empty());
        if url.is_none() && listing.title.trim().is_empty() && listing.keyword.trim().is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "video {} has no url, title or keyword",
                listing.id
            )));
        }

        let mut video = Self::new(listing.id, listing.title, listing.keyword)
            .with_priority(listing.priority);
        video.url = url;
        video.duration_secs = listing.duration;
        Ok(video)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs).filter(|s| *s > 0);
        self
    }

    /// Set the priority, clamped into 1-10.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self
    }

    pub fn has_keyword(&self) -> bool {
        !self.keyword.trim().is_empty()
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Record a completed session.
    pub fn record_completion(&mut self) {
        self.completed_count += 1;
        self.status = VideoStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Record a failed attempt. `permanent` marks the video as errored.
    pub fn record_failure(&mut self, permanent: bool) {
        self.error_count += 1;
        if permanent {
            self.status = VideoStatus::Error;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_processing(&mut self) {
        self.status = VideoStatus::Processing;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> VideoListing {
        VideoListing {
            id: VideoId::new("v1"),
            url: Some("https://youtu.be/abc".to_string()),
            title: "Rust in 100 seconds".to_string(),
            keyword: "rust".to_string(),
            duration: Some(120),
            priority: 7,
        }
    }

    #[test]
    fn test_from_listing_copies_fields() {
        let video = Video::from_listing(listing()).unwrap();
        assert_eq!(video.priority, 7);
        assert_eq!(video.duration_secs, Some(120));
        assert_eq!(video.status, VideoStatus::Pending);
        assert_eq!(video.completed_count, 0);
    }

    #[test]
    fn test_from_listing_rejects_zero_duration() {
        let mut l = listing();
        l.duration = Some(0);
        assert!(Video::from_listing(l).is_err());
    }

    #[test]
    fn test_from_listing_rejects_unlocatable_video() {
        let l = VideoListing {
            id: VideoId::new("v2"),
            url: Some("  ".to_string()),
            title: String::new(),
            keyword: String::new(),
            duration: None,
            priority: 5,
        };
        assert!(Video::from_listing(l).is_err());
    }

    #[test]
    fn test_priority_is_clamped() {
        let v = Video::new(VideoId::new("v"), "t", "k").with_priority(42);
        assert_eq!(v.priority, MAX_PRIORITY);
        let v = Video::new(VideoId::new("v"), "t", "k").with_priority(0);
        assert_eq!(v.priority, MIN_PRIORITY);
    }

    #[test]
    fn test_listing_defaults_priority() {
        let json = r#"{"id":"x","title":"t","keyword":"k"}"#;
        let l: VideoListing = serde_json::from_str(json).unwrap();
        assert_eq!(l.priority, DEFAULT_PRIORITY);
        assert!(l.url.is_none());
    }
}
