//! Ingestion and reporting boundaries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use watchfleet_client::{AggregatorClient, ClientError};
use watchfleet_core::{SessionResult, VideoListing};

use crate::wait::cancellable_sleep;

/// Supplies videos when the queue drains.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn fetch_videos(&self) -> Result<Vec<VideoListing>, ClientError>;
}

/// Accepts one result per attempt.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    async fn submit(&self, result: &SessionResult) -> Result<(), ClientError>;
}

#[async_trait]
impl VideoSource for AggregatorClient {
    async fn fetch_videos(&self) -> Result<Vec<VideoListing>, ClientError> {
        AggregatorClient::fetch_videos(self).await
    }
}

#[async_trait]
impl ResultReporter for AggregatorClient {
    async fn submit(&self, result: &SessionResult) -> Result<(), ClientError> {
        self.submit_result(result).await
    }
}

/// Queue of results awaiting submission.
///
/// Results are handed to a background task so a slow or failing aggregator
/// never blocks a device context.
#[derive(Clone)]
pub struct ResultOutbox {
    tx: Option<mpsc::UnboundedSender<SessionResult>>,
}

impl ResultOutbox {
    /// Outbox that keeps nothing, for running without an aggregator.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Start the delivery task.
    pub fn spawn(
        reporter: Arc<dyn ResultReporter>,
        backoff: Duration,
        max_attempts: u32,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(deliver(rx, reporter, backoff, max_attempts.max(1), cancel));
        (Self { tx: Some(tx) }, handle)
    }

    pub fn send(&self, result: SessionResult) {
        match &self.tx {
            Some(tx) => {
                if tx.send(result).is_err() {
                    warn!("Result outbox closed, dropping result");
                }
            }
            None => debug!(video_id = %result.video_id, "No reporter configured"),
        }
    }
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<SessionResult>,
    reporter: Arc<dyn ResultReporter>,
    backoff: Duration,
    max_attempts: u32,
    cancel: CancellationToken,
) {
    loop {
        let result = tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(result) => result,
                None => return,
            },
            _ = cancel.cancelled() => break,
        };
        submit_with_retry(reporter.as_ref(), &result, backoff, max_attempts, &cancel).await;
    }

    // Shutdown: results queued after the last receive get one attempt each.
    rx.close();
    let mut flushed = 0;
    while let Ok(result) = rx.try_recv() {
        submit_with_retry(reporter.as_ref(), &result, backoff, 1, &cancel).await;
        flushed += 1;
    }
    if flushed > 0 {
        debug!(flushed, "Result outbox flushed on shutdown");
    }
}

async fn submit_with_retry(
    reporter: &dyn ResultReporter,
    result: &SessionResult,
    backoff: Duration,
    max_attempts: u32,
    cancel: &CancellationToken,
) {
    let mut attempt = 1;
    loop {
        match reporter.submit(result).await {
            Ok(()) => {
                debug!(video_id = %result.video_id, attempt, "Result submitted");
                return;
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    video_id = %result.video_id,
                    attempt,
                    error = %e,
                    "Result submission failed, retrying"
                );
                if cancellable_sleep(cancel, backoff).await.is_err() {
                    warn!(video_id = %result.video_id, "Shutdown during retry, result dropped");
                    return;
                }
                attempt += 1;
            }
            Err(e) => {
                error!(
                    video_id = %result.video_id,
                    attempt,
                    error = %e,
                    "Dropping result"
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingReporter;
    use std::sync::atomic::Ordering;
    use watchfleet_core::VideoId;

    fn result() -> SessionResult {
        SessionResult::failed(VideoId::new("v1"), "title", "not found")
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let reporter = Arc::new(RecordingReporter::failing_first(2));
        let (outbox, handle) = ResultOutbox::spawn(
            reporter.clone(),
            Duration::from_secs(60),
            5,
            CancellationToken::new(),
        );
        outbox.send(result());
        drop(outbox);
        handle.await.unwrap();

        assert_eq!(reporter.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(reporter.results().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let reporter = Arc::new(RecordingReporter::failing_first(10));
        let (outbox, handle) = ResultOutbox::spawn(
            reporter.clone(),
            Duration::from_secs(60),
            3,
            CancellationToken::new(),
        );
        outbox.send(result());
        outbox.send(result());
        drop(outbox);
        handle.await.unwrap();

        assert_eq!(reporter.attempts.load(Ordering::SeqCst), 6);
        assert!(reporter.results().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_retry_wait() {
        let reporter = Arc::new(RecordingReporter::failing_first(10));
        let cancel = CancellationToken::new();
        let (outbox, handle) =
            ResultOutbox::spawn(reporter.clone(), Duration::from_secs(3600), 5, cancel.clone());
        outbox.send(result());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(reporter.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_results_delivered_on_shutdown() {
        let reporter = Arc::new(RecordingReporter::slow(Duration::from_secs(1)));
        let cancel = CancellationToken::new();
        let (outbox, handle) =
            ResultOutbox::spawn(reporter.clone(), Duration::from_secs(60), 5, cancel.clone());
        for _ in 0..3 {
            outbox.send(result());
        }
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(reporter.results().len(), 3);
    }

    #[test]
    fn test_disabled_outbox_accepts_results() {
        ResultOutbox::disabled().send(result());
    }
}
