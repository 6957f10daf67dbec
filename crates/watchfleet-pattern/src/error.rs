//! Pattern engine errors.

use thiserror::Error;

/// Errors raised while generating patterns.
#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    /// Video duration must be positive.
    #[error("Invalid video duration: {0}s")]
    InvalidDuration(u32),

    /// Configuration values are inconsistent.
    #[error("Invalid pattern config: {0}")]
    InvalidConfig(String),
}
