//! Task scheduler - routes queued tasks to idle devices.
//!
//! One coordinating loop dispatches tasks; every dispatched task runs in its
//! own execution context until the attempt finishes, fails or is cancelled.
//! Dispatch picks uniformly at random among queued tasks. Priority is kept on
//! the task for display only.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use watchfleet_client::ClientError;
use watchfleet_core::{
    CoreError, Device, DeviceId, SessionResult, Task, TaskId, TaskStatus, Video, VideoId,
    VideoListing, VideoStatus,
};
use watchfleet_pattern::{PatternEngine, RandomModel, RandomSource};

use crate::actuator::ActuatorProvider;
use crate::boundary::{ResultOutbox, VideoSource};
use crate::config::Config;
use crate::fleet::{DeviceCounts, FleetError};
use crate::session::{SessionDriver, SessionError};
use crate::state::{AppState, StatsSummary};
use crate::wait::cancellable_sleep;

/// Scheduler errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Video not found: {0}")]
    VideoNotFound(VideoId),

    #[error("Video {0} already has an active task")]
    DuplicateTask(VideoId),

    #[error("Task {0} already finished as {1}")]
    AlreadyFinished(TaskId, &'static str),

    #[error("Queue refresh failed: {0}")]
    Source(#[from] ClientError),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Task counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub queued: usize,
    pub assigned: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
}

/// Video counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VideoCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
    pub total: usize,
}

/// Pull-based view of the scheduler for front ends.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub tasks: TaskCounts,
    pub devices: DeviceCounts,
    pub videos: VideoCounts,
    pub stats: StatsSummary,
}

/// Per-video task tallies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoProgress {
    pub video_id: VideoId,
    pub title: String,
    pub status: VideoStatus,
    pub completed_count: u64,
    pub error_count: u64,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

struct LoopHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Task scheduler.
pub struct Scheduler {
    state: Arc<AppState>,
    config: Config,
    actuators: Arc<dyn ActuatorProvider>,
    source: Option<Arc<dyn VideoSource>>,
    outbox: ResultOutbox,
    dispatch_rng: Mutex<RandomModel>,
    attempts: AtomicU64,
    main_loop: AsyncMutex<Option<LoopHandle>>,
    contexts: AsyncMutex<JoinSet<()>>,
}

impl Scheduler {
    /// Create a new Scheduler.
    pub fn new(state: Arc<AppState>, config: Config, actuators: Arc<dyn ActuatorProvider>) -> Self {
        let dispatch_rng = match config.seed {
            Some(seed) => RandomModel::seeded(seed),
            None => RandomModel::from_entropy(),
        };
        Self {
            state,
            config,
            actuators,
            source: None,
            outbox: ResultOutbox::disabled(),
            dispatch_rng: Mutex::new(dispatch_rng),
            attempts: AtomicU64::new(0),
            main_loop: AsyncMutex::new(None),
            contexts: AsyncMutex::new(JoinSet::new()),
        }
    }

    /// Refill the queue from `source` whenever it drains.
    pub fn with_source(mut self, source: Arc<dyn VideoSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Hand results to `outbox`.
    pub fn with_outbox(mut self, outbox: ResultOutbox) -> Self {
        self.outbox = outbox;
        self
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queue a task for `video`, registering or refreshing the video record.
    pub async fn enqueue(&self, video: Video) -> Result<Task, SchedulerError> {
        self.enqueue_with_priority(video, None).await
    }

    /// Queue a task whose priority overrides the video's.
    pub async fn enqueue_with_priority(
        &self,
        video: Video,
        priority: Option<u8>,
    ) -> Result<Task, SchedulerError> {
        let mut tasks = self.state.tasks.write().await;
        if tasks
            .values()
            .any(|t| t.video_id == video.id && !t.is_terminal())
        {
            return Err(SchedulerError::DuplicateTask(video.id));
        }

        let mut task = Task::new(&video, self.config.max_retries);
        if let Some(priority) = priority {
            task = task.with_priority(priority);
        }

        {
            let mut videos = self.state.videos.write().await;
            match videos.get_mut(&video.id) {
                Some(existing) => {
                    existing.url = video.url;
                    existing.title = video.title;
                    existing.keyword = video.keyword;
                    existing.duration_secs = video.duration_secs;
                    existing.priority = video.priority;
                }
                None => {
                    videos.insert(video.id.clone(), video);
                }
            }
        }

        info!(
            task_id = %task.id,
            video_id = %task.video_id,
            priority = task.priority,
            "Task queued"
        );
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Validate an ingestion listing and queue it.
    pub async fn enqueue_listing(&self, listing: VideoListing) -> Result<Task, SchedulerError> {
        let video = Video::from_listing(listing)?;
        self.enqueue(video).await
    }

    /// Fetch listings from the source and queue the new ones.
    ///
    /// Returns the number of tasks queued.
    pub async fn refresh_queue(&self) -> Result<usize, SchedulerError> {
        let Some(source) = &self.source else {
            return Ok(0);
        };
        let listings = source.fetch_videos().await?;
        let mut queued = 0;
        for listing in listings {
            let video_id = listing.id.clone();
            match self.enqueue_listing(listing).await {
                Ok(_) => queued += 1,
                Err(SchedulerError::DuplicateTask(_)) => {
                    debug!(video_id = %video_id, "Video already queued");
                }
                Err(e) => warn!(video_id = %video_id, error = %e, "Skipping listing"),
            }
        }
        info!(queued, "Queue refreshed");
        Ok(queued)
    }

    async fn has_queued(&self) -> bool {
        self.state
            .tasks
            .read()
            .await
            .values()
            .any(|t| t.status == TaskStatus::Queued)
    }

    fn random_index(&self, len: usize) -> usize {
        let mut rng = self.dispatch_rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.int_inclusive(0, len as i64 - 1) as usize
    }

    fn cooldown(&self) -> Duration {
        let mut rng = self.dispatch_rng.lock().unwrap_or_else(|e| e.into_inner());
        Duration::from_secs(rng.int_inclusive(
            self.config.inter_task_pause_min_secs as i64,
            self.config.inter_task_pause_max_secs as i64,
        ) as u64)
    }

    /// Dispatch one queued task to an eligible device.
    ///
    /// Returns the dispatched task, or `None` when nothing is queued or no
    /// device is eligible.
    pub async fn tick(self: &Arc<Self>) -> Result<Option<TaskId>, SchedulerError> {
        let mut tasks = self.state.tasks.write().await;

        let mut queued: Vec<&Task> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Queued)
            .collect();
        if queued.is_empty() {
            return Ok(None);
        }
        queued.sort_by(|a, b| a.queued_at.cmp(&b.queued_at).then_with(|| a.id.cmp(&b.id)));
        let task_id = queued[self.random_index(queued.len())].id.clone();

        let device = match self
            .state
            .fleet
            .select_eligible_device(&task_id, Instant::now())
            .await
        {
            Ok(device) => device,
            Err(FleetError::NoDeviceAvailable) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let task = tasks
            .get_mut(&task_id)
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.clone()))?;

        let video = {
            let mut videos = self.state.videos.write().await;
            match videos.get_mut(&task.video_id) {
                Some(video) => {
                    video.mark_processing();
                    Some(video.clone())
                }
                None => None,
            }
        };
        let Some(video) = video else {
            warn!(task_id = %task_id, video_id = %task.video_id, "Video record missing, cancelling task");
            task.cancel()?;
            self.state
                .fleet
                .release(&device.id, None, Duration::ZERO, Instant::now())
                .await?;
            return Err(SchedulerError::VideoNotFound(task.video_id.clone()));
        };

        task.assign(device.id.clone())?;
        task.start()?;
        let task = task.clone();

        let token = CancellationToken::new();
        self.state
            .running
            .write()
            .await
            .insert(task_id.clone(), token.clone());
        drop(tasks);

        info!(
            task_id = %task.id,
            video_id = %video.id,
            device_id = %device.id,
            attempt = task.attempt(),
            "Task dispatched"
        );

        let mut contexts = self.contexts.lock().await;
        while contexts.try_join_next().is_some() {}
        let this = Arc::clone(self);
        contexts.spawn(async move { this.run_attempt(task, device, video, token).await });

        Ok(Some(task_id))
    }

    /// Execute one attempt on its device and record the outcome.
    async fn run_attempt(
        self: Arc<Self>,
        task: Task,
        device: Device,
        video: Video,
        token: CancellationToken,
    ) {
        let actuator = self.actuators.actuator(&device);
        let mut engine = self.session_engine();
        let outcome = SessionDriver::new(
            actuator.as_ref(),
            &mut engine,
            &self.config.discovery,
            &self.config.session,
            &token,
        )
        .run(&video)
        .await;
        self.finish_attempt(&task.id, &device.id, &video, outcome).await;
    }

    fn session_engine(&self) -> PatternEngine {
        let pattern = self.config.pattern.clone();
        match self.config.seed {
            Some(seed) => {
                let n = self.attempts.fetch_add(1, Ordering::Relaxed);
                PatternEngine::seeded(pattern, seed.wrapping_add(n + 1))
            }
            None => PatternEngine::new(pattern, RandomModel::from_entropy()),
        }
    }

    /// Apply an attempt outcome to the task, device, video and stats.
    ///
    /// Only a task still marked running is touched, so a late duplicate
    /// report changes nothing.
    async fn finish_attempt(
        &self,
        task_id: &TaskId,
        device_id: &DeviceId,
        video: &Video,
        outcome: Result<SessionResult, SessionError>,
    ) {
        let mut tasks = self.state.tasks.write().await;
        let Some(task) = tasks.get_mut(task_id) else {
            warn!(task_id = %task_id, "Finished task no longer tracked");
            return;
        };
        if task.status != TaskStatus::Running {
            debug!(task_id = %task_id, status = task.status.as_str(), "Attempt already settled");
            return;
        }

        let now = Instant::now();
        match outcome {
            Ok(result) => {
                if let Err(e) = task.complete() {
                    error!(task_id = %task_id, error = %e, "Failed to complete task");
                }
                self.release(device_id, Some(true), self.cooldown(), now).await;
                if let Some(v) = self.state.videos.write().await.get_mut(&video.id) {
                    v.record_completion();
                }
                self.state.running.write().await.remove(task_id);
                self.state.stats.write().await.record_success(&result);

                info!(
                    task_id = %task_id,
                    device_id = %device_id,
                    watch_time = result.watch_time,
                    liked = result.liked,
                    commented = result.commented,
                    "Task completed"
                );
                self.outbox.send(result);
            }
            Err(e) if e.is_cancelled() => {
                if let Err(e) = task.cancel() {
                    error!(task_id = %task_id, error = %e, "Failed to cancel task");
                }
                self.release(device_id, None, Duration::ZERO, now).await;
                if let Some(v) = self.state.videos.write().await.get_mut(&video.id) {
                    if v.status == VideoStatus::Processing {
                        v.status = if v.completed_count > 0 {
                            VideoStatus::Completed
                        } else {
                            VideoStatus::Pending
                        };
                    }
                }
                self.state.running.write().await.remove(task_id);
                self.state.stats.write().await.record_cancelled();
                info!(task_id = %task_id, device_id = %device_id, "Task cancelled");
            }
            Err(e) => {
                let message = e.to_string();
                let next = match task.fail_attempt(message.clone()) {
                    Ok(next) => next,
                    Err(e) => {
                        error!(task_id = %task_id, error = %e, "Failed to record failure");
                        task.status
                    }
                };
                let permanent = next == TaskStatus::Failed;
                self.release(device_id, Some(false), self.cooldown(), now).await;
                if let Some(v) = self.state.videos.write().await.get_mut(&video.id) {
                    v.record_failure(permanent);
                    if !permanent && v.status == VideoStatus::Processing {
                        v.status = VideoStatus::Pending;
                    }
                }
                self.state.running.write().await.remove(task_id);
                self.state.stats.write().await.record_failure();

                if permanent {
                    warn!(
                        task_id = %task_id,
                        retries = task.retry_count,
                        error = %message,
                        "Task failed permanently"
                    );
                } else {
                    info!(
                        task_id = %task_id,
                        retry = task.retry_count,
                        max_retries = task.max_retries,
                        error = %message,
                        "Attempt failed, task requeued"
                    );
                }
                self.outbox
                    .send(SessionResult::failed(video.id.clone(), video.title.clone(), message));
            }
        }
    }

    async fn release(&self, device_id: &DeviceId, success: Option<bool>, cooldown: Duration, now: Instant) {
        if let Err(e) = self
            .state
            .fleet
            .release(device_id, success, cooldown, now)
            .await
        {
            warn!(device_id = %device_id, error = %e, "Failed to release device");
        }
    }

    /// Cancel one task.
    ///
    /// A queued task is cancelled at once. A running task has its token
    /// cancelled and settles as cancelled within one poll interval; its
    /// current status is returned.
    pub async fn cancel(&self, task_id: &TaskId) -> Result<TaskStatus, SchedulerError> {
        let mut tasks = self.state.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.clone()))?;

        match task.status {
            TaskStatus::Queued => {
                task.cancel()?;
                self.state.stats.write().await.record_cancelled();
                info!(task_id = %task_id, "Queued task cancelled");
                Ok(TaskStatus::Cancelled)
            }
            TaskStatus::Assigned | TaskStatus::Running => {
                if let Some(token) = self.state.running.read().await.get(task_id) {
                    token.cancel();
                }
                info!(task_id = %task_id, "Cancellation requested");
                Ok(task.status)
            }
            status => Err(SchedulerError::AlreadyFinished(task_id.clone(), status.as_str())),
        }
    }

    /// Coordinating loop. Dispatches until `token` is cancelled.
    async fn run(self: Arc<Self>, token: CancellationToken) {
        info!("Scheduler started");
        loop {
            let mut dispatched = 0;
            loop {
                match self.tick().await {
                    Ok(Some(_)) => dispatched += 1,
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Dispatch failed");
                        break;
                    }
                }
            }

            let wait = if dispatched == 0 && self.source.is_some() && !self.has_queued().await {
                match self.refresh_queue().await {
                    Ok(n) if n > 0 => self.config.tick_interval(),
                    Ok(_) => {
                        debug!("No new videos, backing off");
                        self.config.refresh_backoff()
                    }
                    Err(e) => {
                        warn!(error = %e, "Queue refresh failed, backing off");
                        self.config.refresh_backoff()
                    }
                }
            } else {
                self.config.tick_interval()
            };

            if cancellable_sleep(&token, wait).await.is_err() {
                break;
            }
        }
        info!("Scheduler loop exited");
    }

    /// Start the coordinating loop. Returns false if it is already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut main_loop = self.main_loop.lock().await;
        if main_loop.is_some() {
            return false;
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run(token.clone()));
        *main_loop = Some(LoopHandle { token, handle });
        true
    }

    /// Stop dispatching, cancel every running task and wait for all
    /// execution contexts to unwind. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(main_loop) = self.main_loop.lock().await.take() else {
            return false;
        };
        main_loop.token.cancel();
        if let Err(e) = main_loop.handle.await {
            error!(error = %e, "Scheduler loop panicked");
        }

        for token in self.state.running.read().await.values() {
            token.cancel();
        }
        let mut contexts = self.contexts.lock().await;
        while let Some(joined) = contexts.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Session context panicked");
            }
        }
        info!("Scheduler stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.main_loop.lock().await.is_some()
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Option<Task> {
        self.state.tasks.read().await.get(task_id).cloned()
    }

    /// All tasks, oldest first.
    pub async fn list_tasks(&self) -> Vec<Task> {
        let mut list: Vec<Task> = self.state.tasks.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.queued_at.cmp(&b.queued_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub async fn list_devices(&self) -> Vec<Device> {
        self.state.fleet.list().await
    }

    pub async fn video_progress(&self, video_id: &VideoId) -> Option<VideoProgress> {
        let tasks = self.state.tasks.read().await;
        let video = self.state.videos.read().await.get(video_id).cloned()?;

        let mut progress = VideoProgress {
            video_id: video.id,
            title: video.title,
            status: video.status,
            completed_count: video.completed_count,
            error_count: video.error_count,
            queued: 0,
            running: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
        };
        for task in tasks.values().filter(|t| &t.video_id == video_id) {
            match task.status {
                TaskStatus::Queued => progress.queued += 1,
                TaskStatus::Assigned | TaskStatus::Running => progress.running += 1,
                TaskStatus::Completed => progress.completed += 1,
                TaskStatus::Failed => progress.failed += 1,
                TaskStatus::Cancelled => progress.cancelled += 1,
            }
        }
        Some(progress)
    }

    /// Current counts of every task, device and video status plus session stats.
    pub async fn snapshot(&self) -> StatusSnapshot {
        let mut tasks = TaskCounts::default();
        for task in self.state.tasks.read().await.values() {
            match task.status {
                TaskStatus::Queued => tasks.queued += 1,
                TaskStatus::Assigned => tasks.assigned += 1,
                TaskStatus::Running => tasks.running += 1,
                TaskStatus::Completed => tasks.completed += 1,
                TaskStatus::Failed => tasks.failed += 1,
                TaskStatus::Cancelled => tasks.cancelled += 1,
            }
            tasks.total += 1;
        }

        let devices = self.state.fleet.counts().await;

        let mut videos = VideoCounts::default();
        for video in self.state.videos.read().await.values() {
            match video.status {
                VideoStatus::Pending => videos.pending += 1,
                VideoStatus::Processing => videos.processing += 1,
                VideoStatus::Completed => videos.completed += 1,
                VideoStatus::Error => videos.error += 1,
            }
            videos.total += 1;
        }

        StatusSnapshot {
            running: self.is_running().await,
            tasks,
            devices,
            videos,
            stats: self.state.stats.read().await.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;
    use crate::testing::{FakeActuator, FakeProvider, RecordingReporter, StubSource};
    use watchfleet_core::DeviceStatus;

    const TITLE: &str = "Homemade Pasta Without A Machine";

    fn config() -> Config {
        Config {
            seed: Some(5),
            max_retries: 3,
            discovery: DiscoveryConfig {
                decoy_probability: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    struct Harness {
        scheduler: Arc<Scheduler>,
        actuator: Arc<FakeActuator>,
        reporter: Arc<RecordingReporter>,
    }

    async fn harness(config: Config, actuator: FakeActuator, devices: usize) -> Harness {
        let state = AppState::new(&config);
        for i in 0..devices {
            state
                .fleet
                .register(&format!("serial-{i}"), "Pixel 7", "pc-1")
                .await
                .unwrap();
        }
        let provider = FakeProvider::new(actuator);
        let actuator = provider.actuator.clone();
        let reporter = Arc::new(RecordingReporter::default());
        let (outbox, _) = ResultOutbox::spawn(
            reporter.clone(),
            Duration::from_secs(60),
            5,
            CancellationToken::new(),
        );
        let scheduler = Scheduler::new(state, config, Arc::new(provider)).with_outbox(outbox);
        Harness {
            scheduler: Arc::new(scheduler),
            actuator,
            reporter,
        }
    }

    async fn wait_for_status(scheduler: &Scheduler, task_id: &TaskId, status: TaskStatus) -> Task {
        for _ in 0..3600 {
            if let Some(task) = scheduler.get_task(task_id).await {
                if task.status == status {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        panic!("task {task_id} never reached {status:?}");
    }

    fn direct(id: &str) -> Video {
        Video::new(VideoId::new(id), "", "").with_url(format!("https://youtu.be/{id}"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_discovery_retries_then_fails() {
        let h = harness(config(), FakeActuator::new(), 1).await;
        let video = Video::new(VideoId::new("v1"), TITLE, "");
        let task = h.scheduler.enqueue(video).await.unwrap();

        h.scheduler.start().await;
        let failed = wait_for_status(&h.scheduler, &task.id, TaskStatus::Failed).await;
        h.scheduler.stop().await;

        assert_eq!(failed.retry_count, 3);
        assert_eq!(h.actuator.calls("launch:"), 4);

        let device = &h.scheduler.list_devices().await[0];
        assert_eq!(device.total_tasks, 4);
        assert_eq!(device.error_tasks, 4);
        assert_eq!(device.success_tasks, 0);
        assert_eq!(device.status, DeviceStatus::Idle);

        let progress = h.scheduler.video_progress(&VideoId::new("v1")).await.unwrap();
        assert_eq!(progress.status, VideoStatus::Error);
        assert_eq!(progress.error_count, 4);
        assert_eq!(progress.completed_count, 0);

        // Re-ticking never resurrects a failed task.
        assert!(h.scheduler.tick().await.unwrap().is_none());
        assert_eq!(
            h.scheduler.get_task(&task.id).await.unwrap().status,
            TaskStatus::Failed
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        let results = h.reporter.results();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.is_success()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_attempt_updates_aggregates() {
        let actuator = FakeActuator::new()
            .with_full_ui()
            .with_results_page(&[TITLE])
            .with_player_duration(90);
        let h = harness(config(), actuator, 1).await;
        let task = h
            .scheduler
            .enqueue(Video::new(VideoId::new("v1"), TITLE, "homemade pasta"))
            .await
            .unwrap();

        h.scheduler.start().await;
        wait_for_status(&h.scheduler, &task.id, TaskStatus::Completed).await;
        h.scheduler.stop().await;

        let device = &h.scheduler.list_devices().await[0];
        assert_eq!(device.total_tasks, 1);
        assert_eq!(device.success_tasks, 1);
        assert_eq!(device.success_rate(), Some(100.0));

        let progress = h.scheduler.video_progress(&VideoId::new("v1")).await.unwrap();
        assert_eq!(progress.completed_count, 1);
        assert_eq!(progress.status, VideoStatus::Completed);

        let snapshot = h.scheduler.snapshot().await;
        assert!(!snapshot.running);
        assert_eq!(snapshot.tasks.completed, 1);
        assert_eq!(snapshot.stats.completed, 1);
        assert_eq!(snapshot.stats.search_types[0].count, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let results = h.reporter.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
        assert_eq!(results[0].total_duration, 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_running_task() {
        let mut config = config();
        config.pattern.watch.full_watch_probability = 1.0;
        let h = harness(config, FakeActuator::new().with_player_duration(600), 1).await;
        let task = h.scheduler.enqueue(direct("v1")).await.unwrap();

        h.scheduler.start().await;
        wait_for_status(&h.scheduler, &task.id, TaskStatus::Running).await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(h.scheduler.cancel(&task.id).await.unwrap(), TaskStatus::Running);
        let requested = Instant::now();
        wait_for_status(&h.scheduler, &task.id, TaskStatus::Cancelled).await;
        assert!(requested.elapsed() <= Duration::from_millis(1500));

        let device = &h.scheduler.list_devices().await[0];
        assert_eq!(device.total_tasks, 0);
        assert_eq!(device.status, DeviceStatus::Idle);
        assert!(h.scheduler.state().running.read().await.is_empty());

        h.scheduler.stop().await;
        assert!(h.reporter.results().is_empty());
        assert!(matches!(
            h.scheduler.cancel(&task.id).await,
            Err(SchedulerError::AlreadyFinished(..))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_running_task_per_device() {
        let h = harness(config(), FakeActuator::new().with_player_duration(40), 2).await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(h.scheduler.enqueue(direct(&format!("v{i}"))).await.unwrap().id);
        }

        h.scheduler.start().await;
        for _ in 0..2000 {
            let tasks = h.scheduler.list_tasks().await;
            let running: Vec<_> = tasks
                .iter()
                .filter(|t| t.status.is_active())
                .filter_map(|t| t.device_id.clone())
                .collect();
            let mut unique = running.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), running.len());
            assert!(running.len() <= 2);

            if tasks.iter().all(|t| t.status == TaskStatus::Completed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        h.scheduler.stop().await;

        for id in &ids {
            assert_eq!(h.scheduler.get_task(id).await.unwrap().status, TaskStatus::Completed);
        }
        let total: u64 = h.scheduler.list_devices().await.iter().map(|d| d.total_tasks).sum();
        assert_eq!(total, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_refreshes_from_source() {
        let listings = vec![
            VideoListing {
                id: VideoId::new("a"),
                url: Some("https://youtu.be/a".into()),
                title: String::new(),
                keyword: String::new(),
                duration: Some(30),
                priority: 3,
            },
            VideoListing {
                id: VideoId::new("b"),
                url: None,
                title: String::new(),
                keyword: String::new(),
                duration: None,
                priority: 5,
            },
        ];
        let source = Arc::new(StubSource::new(listings));
        let config = config();
        let state = AppState::new(&config);
        let scheduler = Arc::new(
            Scheduler::new(state, config, Arc::new(FakeProvider::new(FakeActuator::new())))
                .with_source(source.clone()),
        );

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await;

        // The unlocatable listing is skipped.
        let tasks = scheduler.list_tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].video_id, VideoId::new("a"));
        assert_eq!(tasks[0].priority, 3);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_backs_off() {
        let source = Arc::new(StubSource::failing());
        let config = config();
        let state = AppState::new(&config);
        let scheduler = Arc::new(
            Scheduler::new(state, config, Arc::new(FakeProvider::new(FakeActuator::new())))
                .with_source(source.clone()),
        );

        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(130)).await;
        scheduler.stop().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancel_queued_and_reject_duplicates() {
        let h = harness(config(), FakeActuator::new(), 0).await;
        let task = h.scheduler.enqueue(direct("v1")).await.unwrap();
        assert!(matches!(
            h.scheduler.enqueue(direct("v1")).await,
            Err(SchedulerError::DuplicateTask(_))
        ));

        // No devices: nothing dispatches.
        assert!(h.scheduler.tick().await.unwrap().is_none());

        assert_eq!(h.scheduler.cancel(&task.id).await.unwrap(), TaskStatus::Cancelled);
        assert!(h.scheduler.enqueue(direct("v1")).await.is_ok());
        assert!(matches!(
            h.scheduler.cancel(&TaskId::new("missing")).await,
            Err(SchedulerError::TaskNotFound(_))
        ));

        let snapshot = h.scheduler.snapshot().await;
        assert_eq!(snapshot.tasks.cancelled, 1);
        assert_eq!(snapshot.tasks.queued, 1);
        assert_eq!(snapshot.videos.total, 1);
    }

    #[tokio::test]
    async fn test_priority_override() {
        let h = harness(config(), FakeActuator::new(), 0).await;
        let task = h
            .scheduler
            .enqueue_with_priority(direct("v1").with_priority(2), Some(9))
            .await
            .unwrap();
        assert_eq!(task.priority, 9);
        assert!(h.scheduler.start().await);
        assert!(!h.scheduler.start().await);
        assert!(h.scheduler.stop().await);
        assert!(!h.scheduler.stop().await);
    }
}
