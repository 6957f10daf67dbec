//! Per-attempt result record handed to the reporting aggregator.

use serde::{Deserialize, Serialize};

use crate::{CoreError, VideoId};

/// Discovery tactic that located the video. Serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SearchType {
    /// Plain keyword search.
    Keyword = 1,
    /// Keyword search filtered to recent uploads.
    Recent = 2,
    /// Search by exact title.
    Title = 3,
    /// Opened the URL directly.
    DirectUrl = 4,
}

impl SearchType {
    pub const ALL: [SearchType; 4] = [Self::Keyword, Self::Recent, Self::Title, Self::DirectUrl];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Recent => "recent",
            Self::Title => "title",
            Self::DirectUrl => "direct_url",
        }
    }
}

impl From<SearchType> for u8 {
    fn from(value: SearchType) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for SearchType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Keyword),
            2 => Ok(Self::Recent),
            3 => Ok(Self::Title),
            4 => Ok(Self::DirectUrl),
            other => Err(CoreError::InvalidInput(format!("unknown search type {other}"))),
        }
    }
}

/// Outcome of a reported attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Completed,
    Error,
}

/// Result of one session attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub video_id: VideoId,
    pub title: String,
    /// Seconds actually watched.
    pub watch_time: u32,
    /// Duration of the video in seconds.
    pub total_duration: u32,
    pub liked: bool,
    pub commented: bool,
    pub comment_text: String,
    pub search_type: Option<SearchType>,
    /// 1-based position in the result list, 0 for direct navigation.
    pub search_rank: u32,
    pub screenshot_path: Option<String>,
    pub status: ResultStatus,
    /// Failure reason for error results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SessionResult {
    /// An error result with nothing watched.
    pub fn failed(video_id: VideoId, title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            video_id,
            title: title.into(),
            watch_time: 0,
            total_duration: 0,
            liked: false,
            commented: false,
            comment_text: String::new(),
            search_type: None,
            search_rank: 0,
            screenshot_path: None,
            status: ResultStatus::Error,
            error_message: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Completed
    }

    /// Percentage of the video watched, 0 when the duration is unknown.
    pub fn watch_percent(&self) -> f64 {
        if self.total_duration == 0 {
            0.0
        } else {
            self.watch_time as f64 / self.total_duration as f64 * 100.0
        }
    }
}
