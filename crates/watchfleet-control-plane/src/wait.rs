//! Cancellable waits.
//!
//! Every suspension point in the control plane goes through
//! [`cancellable_sleep`], so a stop or cancel request is observed at the next
//! boundary rather than only at loop start.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The wait was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

/// Sleep for `duration` unless `token` is cancelled first.
pub async fn cancellable_sleep(token: &CancellationToken, duration: Duration) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        return Err(Cancelled);
    }
    tokio::select! {
        _ = token.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Fail fast if `token` is already cancelled.
pub fn check(token: &CancellationToken) -> Result<(), Cancelled> {
    if token.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}
