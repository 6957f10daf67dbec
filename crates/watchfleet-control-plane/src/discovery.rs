//! Discovery state machine.
//!
//! Tactics are tried in a fixed order until one finds the video:
//! keyword search, keyword search filtered to recent uploads, title search
//! and finally direct URL navigation. Search tactics scan a bounded number of
//! result pages; each scanned page may trigger a short decoy watch of an
//! unrelated result. A failed tactic navigates back before the next one runs.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use watchfleet_client::{ElementHandle, Key, Selector};
use watchfleet_core::{SearchType, Video, VideoId};
use watchfleet_pattern::{PatternEngine, RandomSource, ScreenSize};

use crate::actuator::{Actuator, ActuatorError};
use crate::config::DiscoveryConfig;
use crate::gestures::{scroll_page, tap_element, type_naturally, GestureError};
use crate::wait::{cancellable_sleep, check, Cancelled};

pub const SEARCH_BUTTON: &str = "Search";
pub const SEARCH_FIELD: &str = "com.google.android.youtube:id/search_edit_text";
pub const FILTER_BUTTON: &str = "Search filters";
pub const FILTER_APPLY: &str = "Apply";

/// Discovery errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Video {video_id} not found after {attempted:?}")]
    Exhausted {
        video_id: VideoId,
        attempted: Vec<SearchType>,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

impl From<GestureError> for DiscoveryError {
    fn from(e: GestureError) -> Self {
        match e {
            GestureError::Actuator(e) => Self::Actuator(e),
            GestureError::Cancelled(e) => Self::Cancelled(e),
        }
    }
}

/// Where the target was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub search_type: SearchType,
    /// 1-based position across scanned pages, 0 for direct navigation.
    pub rank: u32,
    /// Result entry to open. `None` when the video is already playing.
    pub element: Option<ElementHandle>,
}

#[derive(Debug)]
enum DiscoveryState {
    /// Consider the tactic at this index.
    Next(usize),
    Trying(usize, SearchType),
    Found(Discovery),
    Exhausted,
}

/// Runs the tactic sequence for one attempt.
pub struct DiscoveryStrategy<'a> {
    actuator: &'a dyn Actuator,
    engine: &'a mut PatternEngine,
    config: &'a DiscoveryConfig,
    screen: ScreenSize,
    cancel: &'a CancellationToken,
}

impl<'a> DiscoveryStrategy<'a> {
    pub fn new(
        actuator: &'a dyn Actuator,
        engine: &'a mut PatternEngine,
        config: &'a DiscoveryConfig,
        screen: ScreenSize,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            actuator,
            engine,
            config,
            screen,
            cancel,
        }
    }

    /// Whether the video carries what `tactic` needs.
    pub fn applicable(tactic: SearchType, video: &Video) -> bool {
        match tactic {
            // Results are matched by title, so a keyword search without one
            // could never match. Skip it instead of scrolling every page.
            SearchType::Keyword | SearchType::Recent => video.has_keyword() && video.has_title(),
            SearchType::Title => video.has_title(),
            SearchType::DirectUrl => video.url.is_some(),
        }
    }

    /// Try every applicable tactic in order.
    pub async fn discover(&mut self, video: &Video) -> Result<Discovery, DiscoveryError> {
        let mut attempted = Vec::new();
        let mut state = DiscoveryState::Next(0);

        loop {
            state = match state {
                DiscoveryState::Next(idx) => match SearchType::ALL.get(idx) {
                    None => DiscoveryState::Exhausted,
                    Some(&tactic) if !Self::applicable(tactic, video) => {
                        debug!(video_id = %video.id, tactic = tactic.as_str(), "Skipping tactic");
                        DiscoveryState::Next(idx + 1)
                    }
                    Some(&tactic) => DiscoveryState::Trying(idx, tactic),
                },
                DiscoveryState::Trying(idx, tactic) => {
                    check(self.cancel)?;
                    attempted.push(tactic);
                    debug!(video_id = %video.id, tactic = tactic.as_str(), "Trying tactic");
                    match self.run_tactic(tactic, video).await? {
                        Some(found) => DiscoveryState::Found(found),
                        None => {
                            self.actuator.back().await?;
                            DiscoveryState::Next(idx + 1)
                        }
                    }
                }
                DiscoveryState::Found(found) => {
                    info!(
                        video_id = %video.id,
                        search_type = found.search_type.as_str(),
                        rank = found.rank,
                        "Video found"
                    );
                    return Ok(found);
                }
                DiscoveryState::Exhausted => {
                    return Err(DiscoveryError::Exhausted {
                        video_id: video.id.clone(),
                        attempted,
                    });
                }
            };
        }
    }

    async fn run_tactic(
        &mut self,
        tactic: SearchType,
        video: &Video,
    ) -> Result<Option<Discovery>, DiscoveryError> {
        match tactic {
            SearchType::Keyword => {
                self.search(tactic, &video.keyword, &video.title, self.config.keyword_max_pages)
                    .await
            }
            SearchType::Recent => {
                self.search(tactic, &video.keyword, &video.title, self.config.recent_max_pages)
                    .await
            }
            SearchType::Title => {
                self.search(tactic, &video.title, &video.title, self.config.title_max_pages)
                    .await
            }
            SearchType::DirectUrl => match &video.url {
                Some(url) => {
                    self.actuator.open_url(url).await?;
                    self.settle().await?;
                    Ok(Some(Discovery {
                        search_type: SearchType::DirectUrl,
                        rank: 0,
                        element: None,
                    }))
                }
                None => Ok(None),
            },
        }
    }

    async fn find(&self, selectors: &[Selector]) -> Result<Option<ElementHandle>, ActuatorError> {
        self.actuator
            .find_element(selectors, self.config.element_timeout_ms)
            .await
    }

    async fn settle(&self) -> Result<(), Cancelled> {
        cancellable_sleep(self.cancel, Duration::from_millis(self.config.settle_ms)).await
    }

    async fn search(
        &mut self,
        tactic: SearchType,
        query: &str,
        title: &str,
        max_pages: u32,
    ) -> Result<Option<Discovery>, DiscoveryError> {
        let Some(button) = self.find(&[Selector::description(SEARCH_BUTTON)]).await? else {
            return Ok(None);
        };
        tap_element(self.actuator, self.engine, &button).await?;

        let Some(field) = self.find(&[Selector::id(SEARCH_FIELD)]).await? else {
            return Ok(None);
        };
        type_naturally(self.actuator, self.engine, &field, query, self.cancel).await?;
        self.actuator.press_key(Key::Enter).await?;
        self.settle().await?;

        if tactic == SearchType::Recent && !self.apply_recent_filter().await? {
            debug!("Recency filter unavailable");
            return Ok(None);
        }

        let mut rank = 0;
        for page in 0..max_pages {
            check(self.cancel)?;
            if page > 0 {
                scroll_page(self.actuator, self.engine, self.screen, self.cancel).await?;
            }

            let results = self.actuator.visible_results().await?;
            for element in &results {
                rank += 1;
                if matches_title(element, title) {
                    return Ok(Some(Discovery {
                        search_type: tactic,
                        rank,
                        element: Some(element.clone()),
                    }));
                }
            }

            self.maybe_decoy(&results).await?;
        }
        Ok(None)
    }

    async fn apply_recent_filter(&mut self) -> Result<bool, DiscoveryError> {
        let Some(filters) = self
            .find(&[Selector::description(FILTER_BUTTON), Selector::text("Filters")])
            .await?
        else {
            return Ok(false);
        };
        tap_element(self.actuator, self.engine, &filters).await?;

        let Some(option) = self
            .find(&[Selector::text(self.config.recent_filter_label.clone())])
            .await?
        else {
            return Ok(false);
        };
        tap_element(self.actuator, self.engine, &option).await?;

        if let Some(apply) = self.find(&[Selector::text(FILTER_APPLY)]).await? {
            tap_element(self.actuator, self.engine, &apply).await?;
        }
        self.settle().await?;
        Ok(true)
    }

    /// Occasionally open an unrelated result, watch a little and come back.
    async fn maybe_decoy(&mut self, results: &[ElementHandle]) -> Result<(), DiscoveryError> {
        if results.is_empty() || !self.engine.rng().chance(self.config.decoy_probability) {
            return Ok(());
        }
        let Some(decoy) = self.engine.rng().pick(results).cloned() else {
            return Ok(());
        };
        let dwell = self
            .engine
            .rng()
            .int_inclusive(self.config.decoy_min_secs as i64, self.config.decoy_max_secs as i64)
            as u64;

        info!(element = %decoy.id, dwell_secs = dwell, "Decoy watch");
        tap_element(self.actuator, self.engine, &decoy).await?;
        cancellable_sleep(self.cancel, Duration::from_secs(dwell)).await?;
        self.actuator.back().await?;
        Ok(())
    }
}

/// Case-insensitive containment of the normalized title.
fn matches_title(element: &ElementHandle, title: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let title = normalize(title);
    !title.is_empty()
        && element
            .text
            .as_deref()
            .map_or(false, |text| normalize(text).contains(&title))
}
