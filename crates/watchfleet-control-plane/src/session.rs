//! Session driver.
//!
//! Runs one attempt end to end on a single device: launch the app, locate
//! the video, watch it following a [`HumanPattern`], then report what was
//! actually done. The watch loop advances in poll-interval steps and checks
//! the cancellation token at every step.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use watchfleet_client::{ElementHandle, Selector};
use watchfleet_core::{ResultStatus, SessionResult, Video};
use watchfleet_pattern::{BoundingBox, HumanPattern, PatternEngine, PatternError, Point};

use crate::actuator::{Actuator, ActuatorError};
use crate::config::{DiscoveryConfig, SessionConfig};
use crate::discovery::{DiscoveryError, DiscoveryStrategy};
use crate::gestures::{scroll_page, tap_element, type_naturally, GestureError};
use crate::wait::{cancellable_sleep, check, Cancelled};

pub const LIKE_BUTTON: &str = "com.google.android.youtube:id/like_button";
pub const COMMENTS_ENTRY: &str = "Comments";
pub const COMMENT_INPUT: &str = "Add a comment...";
pub const COMMENT_SEND: &str = "Send comment";

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<GestureError> for SessionError {
    fn from(e: GestureError) -> Self {
        match e {
            GestureError::Actuator(e) => Self::Actuator(e),
            GestureError::Cancelled(e) => Self::Cancelled(e),
        }
    }
}

impl SessionError {
    /// Whether the attempt stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled(_) | Self::Discovery(DiscoveryError::Cancelled(_))
        )
    }
}

/// Interactions that actually went through.
#[derive(Debug, Default)]
struct Performed {
    liked: bool,
    commented: bool,
    comment_text: String,
    seeks: u32,
}

/// Drives one session attempt on one device.
pub struct SessionDriver<'a> {
    actuator: &'a dyn Actuator,
    engine: &'a mut PatternEngine,
    discovery: &'a DiscoveryConfig,
    config: &'a SessionConfig,
    cancel: &'a CancellationToken,
}

impl<'a> SessionDriver<'a> {
    pub fn new(
        actuator: &'a dyn Actuator,
        engine: &'a mut PatternEngine,
        discovery: &'a DiscoveryConfig,
        config: &'a SessionConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            actuator,
            engine,
            discovery,
            config,
            cancel,
        }
    }

    /// Run the attempt. The device is sent home on every exit path.
    pub async fn run(&mut self, video: &Video) -> Result<SessionResult, SessionError> {
        let result = self.drive(video).await;
        if result.is_err() {
            if let Err(e) = self.actuator.home().await {
                debug!(error = %e, "Failed to return home after session error");
            }
        }
        result
    }

    async fn drive(&mut self, video: &Video) -> Result<SessionResult, SessionError> {
        check(self.cancel)?;
        self.actuator.launch_app(&self.config.app_package).await?;
        self.wait_ms(self.config.launch_wait_ms).await?;

        let found = DiscoveryStrategy::new(
            self.actuator,
            &mut *self.engine,
            self.discovery,
            self.config.screen,
            self.cancel,
        )
        .discover(video)
        .await?;

        if let Some(element) = &found.element {
            tap_element(self.actuator, self.engine, element).await?;
        }
        self.wait_ms(self.config.load_wait_ms).await?;

        let duration = self.resolve_duration(video).await;
        let plan = self.engine.human_pattern(duration)?;
        info!(
            video_id = %video.id,
            duration,
            watch_time = plan.watch.watch_time,
            seeks = plan.watch.seek_timings.len(),
            like_at = ?plan.interaction.like_at,
            comment_at = ?plan.interaction.comment_at,
            "Session planned"
        );

        let performed = self.play(&plan).await?;

        let screenshot_path = if self.config.capture_screenshot {
            match self.actuator.capture_screen().await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Screenshot failed");
                    None
                }
            }
        } else {
            None
        };
        self.actuator.home().await?;

        info!(
            video_id = %video.id,
            watch_time = plan.watch.watch_time,
            seeks = performed.seeks,
            liked = performed.liked,
            commented = performed.commented,
            "Session finished"
        );

        Ok(SessionResult {
            video_id: video.id.clone(),
            title: video.title.clone(),
            watch_time: plan.watch.watch_time,
            total_duration: duration,
            liked: performed.liked,
            commented: performed.commented,
            comment_text: performed.comment_text,
            search_type: Some(found.search_type),
            search_rank: found.rank,
            screenshot_path,
            status: ResultStatus::Completed,
            error_message: None,
        })
    }

    /// Player duration, then the listing's duration, then the default.
    async fn resolve_duration(&self, video: &Video) -> u32 {
        let fallback = video
            .duration_secs
            .filter(|d| *d > 0)
            .unwrap_or(self.config.default_duration_secs);
        match self.actuator.read_player_duration().await {
            Ok(Some(secs)) if secs > 0 => secs,
            Ok(_) => fallback,
            Err(e) => {
                warn!(error = %e, fallback, "Could not read player duration");
                fallback
            }
        }
    }

    /// Polled watch loop covering the watch time and every scheduled interaction.
    async fn play(&mut self, plan: &HumanPattern) -> Result<Performed, SessionError> {
        let watch_time = plan.watch.watch_time;
        let end_ms = plan.session_length() as u64 * 1000;
        let poll = self.config.poll_interval_ms.max(1);

        let mut seeks = plan
            .watch
            .seek_timings
            .iter()
            .copied()
            .filter(|at| *at <= watch_time)
            .peekable();
        let mut like_at = plan.interaction.like_at.filter(|_| plan.interaction.should_like);
        let mut comment = plan
            .interaction
            .comment_at
            .zip(plan.interaction.comment_text.clone())
            .filter(|_| plan.interaction.should_comment);

        let mut performed = Performed::default();
        let mut elapsed_ms = 0u64;

        while elapsed_ms < end_ms {
            self.wait_ms(poll).await?;
            elapsed_ms += poll;
            let now = (elapsed_ms / 1000) as u32;

            while seeks.next_if(|at| *at <= now).is_some() {
                self.seek().await?;
                performed.seeks += 1;
            }

            if like_at.is_some_and(|at| at <= now) {
                like_at = None;
                performed.liked = self.like().await?;
            }

            if comment.as_ref().is_some_and(|(at, _)| *at <= now) {
                if let Some((_, text)) = comment.take() {
                    if self.comment(&text).await? {
                        performed.commented = true;
                        performed.comment_text = text;
                    }
                }
            }
        }
        Ok(performed)
    }

    fn player_box(&self, x_ratio: f64) -> BoundingBox {
        let screen = self.config.screen;
        let center = Point::new(
            (screen.width as f64 * x_ratio).round() as i32,
            (screen.height as f64 * self.config.seek_y_ratio).round() as i32,
        );
        BoundingBox::centered(center, self.config.seek_box_width, self.config.seek_box_height)
    }

    /// Double tap the right side of the player.
    async fn seek(&mut self) -> Result<(), ActuatorError> {
        let target = self.player_box(self.config.seek_x_ratio);
        let tap = self.engine.double_tap(target);
        self.actuator.double_tap(&tap).await
    }

    async fn find(&self, selectors: &[Selector]) -> Result<Option<ElementHandle>, ActuatorError> {
        self.actuator
            .find_element(selectors, self.discovery.element_timeout_ms)
            .await
    }

    async fn like(&mut self) -> Result<bool, SessionError> {
        let target = self.player_box(0.5);
        let reveal = self.engine.tap(target);
        self.actuator.tap(&reveal).await?;

        let Some(button) = self
            .find(&[Selector::id(LIKE_BUTTON), Selector::description("like this video")])
            .await?
        else {
            debug!("Like button not found");
            return Ok(false);
        };
        tap_element(self.actuator, self.engine, &button).await?;
        Ok(true)
    }

    async fn comment(&mut self, text: &str) -> Result<bool, SessionError> {
        scroll_page(self.actuator, self.engine, self.config.screen, self.cancel).await?;

        let Some(entry) = self.find(&[Selector::text_contains(COMMENTS_ENTRY)]).await? else {
            debug!("Comments section not found");
            return Ok(false);
        };
        tap_element(self.actuator, self.engine, &entry).await?;

        let Some(input) = self.find(&[Selector::text(COMMENT_INPUT)]).await? else {
            self.actuator.back().await?;
            return Ok(false);
        };
        tap_element(self.actuator, self.engine, &input).await?;
        type_naturally(self.actuator, self.engine, &input, text, self.cancel).await?;

        let Some(send) = self.find(&[Selector::description(COMMENT_SEND)]).await? else {
            self.actuator.back().await?;
            return Ok(false);
        };
        tap_element(self.actuator, self.engine, &send).await?;
        self.actuator.back().await?;
        Ok(true)
    }

    async fn wait_ms(&self, ms: u64) -> Result<(), Cancelled> {
        cancellable_sleep(self.cancel, Duration::from_millis(ms)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeActuator;
    use tokio::time::Instant;
    use watchfleet_core::{SearchType, VideoId};
    use watchfleet_pattern::PatternConfig;

    const TITLE: &str = "Sourdough Starter From Scratch";

    fn video() -> Video {
        Video::new(VideoId::new("v1"), TITLE, "sourdough starter")
    }

    fn discovery() -> DiscoveryConfig {
        DiscoveryConfig {
            decoy_probability: 0.0,
            ..Default::default()
        }
    }

    fn eager_pattern() -> PatternConfig {
        let mut config = PatternConfig::default();
        config.interaction.like_rate_min = 1.0;
        config.interaction.like_rate_max = 1.0;
        config.interaction.comment_rate_min = 1.0;
        config.interaction.comment_rate_max = 1.0;
        config
    }

    async fn run(
        actuator: &FakeActuator,
        pattern: PatternConfig,
        video: &Video,
        cancel: &CancellationToken,
    ) -> Result<SessionResult, SessionError> {
        let mut engine = PatternEngine::seeded(pattern, 11);
        let discovery = discovery();
        let session = SessionConfig::default();
        SessionDriver::new(actuator, &mut engine, &discovery, &session, cancel)
            .run(video)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_session_reports_what_happened() {
        let actuator = FakeActuator::new()
            .with_full_ui()
            .with_results_page(&[TITLE])
            .with_player_duration(120);

        let result = run(&actuator, eager_pattern(), &video(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Completed);
        assert_eq!(result.total_duration, 120);
        assert!(result.watch_time >= 10 && result.watch_time <= 120);
        assert_eq!(result.search_type, Some(SearchType::Keyword));
        assert_eq!(result.search_rank, 1);
        assert!(result.liked);
        assert!(result.commented);
        assert!(!result.comment_text.is_empty());
        assert!(actuator.typed().ends_with(&result.comment_text));
        assert!(result.screenshot_path.is_some());
        assert_eq!(actuator.log().last().map(String::as_str), Some("home"));
        assert_eq!(actuator.calls("launch:com.google.android.youtube"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_like_button_is_not_reported_as_liked() {
        let actuator = FakeActuator::new()
            .with_element(crate::discovery::SEARCH_BUTTON)
            .with_element(crate::discovery::SEARCH_FIELD)
            .with_results_page(&[TITLE])
            .with_player_duration(60);

        let result = run(&actuator, eager_pattern(), &video(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.liked);
        assert!(!result.commented);
        assert!(result.comment_text.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_falls_back_to_listing_then_default() {
        let actuator = FakeActuator::new();
        let video = video().with_url("https://youtu.be/x").with_duration(90);
        let result = run(&actuator, PatternConfig::default(), &video, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.total_duration, 90);
        assert_eq!(result.search_type, Some(SearchType::DirectUrl));
        assert_eq!(result.search_rank, 0);

        let actuator = FakeActuator::new();
        let video = Video::new(VideoId::new("v2"), "", "").with_url("https://youtu.be/y");
        let result = run(&actuator, PatternConfig::default(), &video, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.total_duration, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeks_stay_within_watch_time() {
        let actuator = FakeActuator::new().with_player_duration(600);
        let video = video().with_url("https://youtu.be/x");
        let mut pattern = PatternConfig::default();
        pattern.watch.full_watch_probability = 1.0;

        let result = run(&actuator, pattern, &video, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.watch_time, 600);
        let seeks = actuator.calls("double_tap");
        assert!((5..=20).contains(&seeks), "seeks = {seeks}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_unwinds_within_one_poll() {
        let actuator = FakeActuator::new().with_player_duration(600);
        let video = video().with_url("https://youtu.be/x");
        let mut pattern = PatternConfig::default();
        pattern.watch.full_watch_probability = 1.0;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = run(&actuator, pattern, &video, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(31));
        assert_eq!(actuator.calls("screenshot"), 0);
        assert_eq!(actuator.log().last().map(String::as_str), Some("home"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_failure_goes_home() {
        let actuator = FakeActuator::new();
        let err = run(&actuator, PatternConfig::default(), &video(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Discovery(DiscoveryError::Exhausted { .. })
        ));
        assert!(!err.is_cancelled());
        assert_eq!(actuator.calls("home"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure() {
        let actuator = FakeActuator::new().failing_launch();
        let err = run(&actuator, PatternConfig::default(), &video(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Actuator(_)));
        assert_eq!(actuator.calls("player_duration"), 0);
    }
}
