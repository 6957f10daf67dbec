//! Pattern engine façade.

use serde::{Deserialize, Serialize};

use crate::config::PatternConfig;
use crate::error::PatternError;
use crate::interaction::{self, InteractionPattern, InteractionRates};
use crate::random::{RandomModel, RandomSource};
use crate::swipe::{self, ScreenSize, SeekDirection, Swipe};
use crate::touch::{self, BoundingBox, DoubleTap, Point, SequencedTap, Tap};
use crate::typing::{self, TypingPlan};
use crate::watch::{self, WatchDistribution, WatchPattern};

/// Complete plan for one session attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanPattern {
    /// Video duration the plan was sized to, in seconds.
    pub duration: u32,
    pub watch: WatchPattern,
    pub interaction: InteractionPattern,
}

impl HumanPattern {
    /// Seconds the session has to stay open to cover the watch and every
    /// scheduled interaction.
    pub fn session_length(&self) -> u32 {
        self.interaction
            .last_offset()
            .map_or(self.watch.watch_time, |last| last.max(self.watch.watch_time))
    }
}

/// Owns a configuration and a random source; every generator draws from it.
#[derive(Debug, Clone)]
pub struct PatternEngine<S = RandomModel> {
    config: PatternConfig,
    rng: S,
}

impl PatternEngine<RandomModel> {
    /// Engine with a reproducible seed.
    pub fn seeded(config: PatternConfig, seed: u64) -> Self {
        Self::new(config, RandomModel::seeded(seed))
    }
}

impl<S: RandomSource> PatternEngine<S> {
    pub fn new(config: PatternConfig, rng: S) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Direct access to the random source for ad hoc decisions.
    pub fn rng(&mut self) -> &mut S {
        &mut self.rng
    }

    pub fn watch_pattern(&mut self, duration: u32) -> Result<WatchPattern, PatternError> {
        watch::generate(&mut self.rng, &self.config.watch, duration)
    }

    pub fn interaction_pattern(&mut self, watch_time: u32) -> InteractionPattern {
        interaction::generate(&mut self.rng, &self.config.interaction, watch_time)
    }

    /// Watch and interaction plan for a video of `duration` seconds.
    pub fn human_pattern(&mut self, duration: u32) -> Result<HumanPattern, PatternError> {
        let watch = self.watch_pattern(duration)?;
        let interaction = self.interaction_pattern(watch.watch_time);
        Ok(HumanPattern {
            duration,
            watch,
            interaction,
        })
    }

    pub fn tap(&mut self, bbox: BoundingBox) -> Tap {
        touch::natural_tap(&mut self.rng, &self.config.touch, bbox)
    }

    pub fn double_tap(&mut self, bbox: BoundingBox) -> DoubleTap {
        touch::double_tap(&mut self.rng, &self.config.touch, bbox)
    }

    pub fn long_press(&mut self, bbox: BoundingBox, press_ms: u32) -> Tap {
        touch::long_press(&mut self.rng, &self.config.touch, bbox, press_ms)
    }

    pub fn tap_sequence(&mut self, boxes: &[BoundingBox]) -> Vec<SequencedTap> {
        touch::tap_sequence(&mut self.rng, &self.config.touch, boxes)
    }

    pub fn swipe(&mut self, start: Point, end: Point, duration_ms: Option<u32>) -> Swipe {
        swipe::generate(&mut self.rng, &self.config.scroll, start, end, duration_ms)
    }

    pub fn scroll_down(&mut self, screen: ScreenSize) -> Swipe {
        swipe::scroll_down(&mut self.rng, &self.config.scroll, screen)
    }

    pub fn scroll_up(&mut self, screen: ScreenSize) -> Swipe {
        swipe::scroll_up(&mut self.rng, &self.config.scroll, screen)
    }

    pub fn seek_swipe(&mut self, screen: ScreenSize, direction: SeekDirection) -> Swipe {
        swipe::seek_swipe(&mut self.rng, &self.config.scroll, screen, direction)
    }

    /// Dwell band name and seconds for one shorts-style item.
    pub fn shorts_dwell(&mut self) -> (String, f64) {
        swipe::shorts_dwell(&mut self.rng, &self.config.scroll)
    }

    pub fn typing_plan(&mut self, text: &str) -> TypingPlan {
        typing::plan(&mut self.rng, &self.config.typing, text)
    }

    pub fn simulate_watch_distribution(
        &mut self,
        duration: u32,
        samples: usize,
    ) -> Result<WatchDistribution, PatternError> {
        watch::simulate(&mut self.rng, &self.config.watch, duration, samples)
    }

    pub fn simulate_interaction_rates(
        &mut self,
        watch_time: u32,
        samples: usize,
    ) -> Result<InteractionRates, PatternError> {
        interaction::simulate(&mut self.rng, &self.config.interaction, watch_time, samples)
    }
}
