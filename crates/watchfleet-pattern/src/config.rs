//! Probability tables and bounds for the pattern engine.
//!
//! Every field has a default, so a partial JSON document deserializes into a
//! complete configuration.

use serde::{Deserialize, Serialize};

use crate::error::PatternError;
use crate::swipe::Easing;

/// Full pattern engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub watch: WatchConfig,
    pub interaction: InteractionConfig,
    pub touch: TouchConfig,
    pub scroll: ScrollConfig,
    pub typing: TypingConfig,
}

impl PatternConfig {
    /// Reject bounds and probability tables that cannot be sampled.
    pub fn validate(&self) -> Result<(), PatternError> {
        let w = &self.watch;
        probability("watch.full_watch_probability", w.full_watch_probability)?;
        positive("watch.beta_alpha", w.beta_alpha)?;
        positive("watch.beta_beta", w.beta_beta)?;
        ordered("watch.seek_count", w.seek_count_min as f64, w.seek_count_max as f64)?;

        let i = &self.interaction;
        ordered("interaction.like_rate", i.like_rate_min, i.like_rate_max)?;
        ordered("interaction.comment_rate", i.comment_rate_min, i.comment_rate_max)?;
        probability("interaction.like_rate_max", i.like_rate_max)?;
        probability("interaction.comment_rate_max", i.comment_rate_max)?;
        let total = i.like_timing.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(PatternError::InvalidConfig(format!(
                "interaction.like_timing weights sum to {total}, expected 1"
            )));
        }

        let t = &self.touch;
        ordered("touch.duration", t.duration_min_ms, t.duration_max_ms)?;
        ordered(
            "touch.double_tap_interval",
            t.double_tap_interval_min_ms as f64,
            t.double_tap_interval_max_ms as f64,
        )?;
        ordered(
            "touch.sequence_interval",
            t.sequence_interval_min_ms as f64,
            t.sequence_interval_max_ms as f64,
        )?;

        let s = &self.scroll;
        ordered("scroll.duration", s.duration_min_ms as f64, s.duration_max_ms as f64)?;
        ordered("scroll.pause_after", s.pause_after_min_ms as f64, s.pause_after_max_ms as f64)?;
        if s.dwell_bands.is_empty() {
            return Err(PatternError::InvalidConfig("scroll.dwell_bands is empty".into()));
        }
        for band in &s.dwell_bands {
            ordered("scroll.dwell_bands", band.min_secs, band.max_secs)?;
            probability("scroll.dwell_bands.weight", band.weight)?;
        }

        let ty = &self.typing;
        ordered("typing.char_delay", ty.char_delay_min_ms, ty.char_delay_max_ms)?;
        probability("typing.think_probability", ty.think_probability)?;
        probability("typing.typo_probability", ty.typo_probability)?;
        Ok(())
    }
}

fn probability(name: &str, p: f64) -> Result<(), PatternError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(PatternError::InvalidConfig(format!("{name} must be in [0, 1], got {p}")))
    }
}

fn positive(name: &str, v: f64) -> Result<(), PatternError> {
    if v > 0.0 {
        Ok(())
    } else {
        Err(PatternError::InvalidConfig(format!("{name} must be positive, got {v}")))
    }
}

fn ordered(name: &str, min: f64, max: f64) -> Result<(), PatternError> {
    if min <= max {
        Ok(())
    } else {
        Err(PatternError::InvalidConfig(format!("{name} min {min} exceeds max {max}")))
    }
}

/// Watch duration and seek settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub beta_alpha: f64,
    pub beta_beta: f64,
    pub min_watch_secs: u32,
    pub full_watch_probability: f64,
    pub seek_enabled: bool,
    /// Seeking only happens when the watch time exceeds this.
    pub seek_threshold_secs: u32,
    pub seek_count_min: u32,
    pub seek_count_max: u32,
    /// Jitter applied to each seek as a fraction of the seek interval.
    pub seek_jitter_ratio: f64,
    /// Earliest allowed seek.
    pub seek_floor_secs: u32,
    /// Seeks stay this far before the end of the watch.
    pub seek_tail_margin_secs: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            beta_alpha: 2.0,
            beta_beta: 5.0,
            min_watch_secs: 10,
            full_watch_probability: 0.05,
            seek_enabled: true,
            seek_threshold_secs: 30,
            seek_count_min: 5,
            seek_count_max: 20,
            seek_jitter_ratio: 0.2,
            seek_floor_secs: 10,
            seek_tail_margin_secs: 5,
        }
    }
}

/// Cumulative weights of the like timing buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikeTimingWeights {
    pub immediate: f64,
    pub middle: f64,
    pub after: f64,
    pub delayed: f64,
}

impl LikeTimingWeights {
    pub fn total(&self) -> f64 {
        self.immediate + self.middle + self.after + self.delayed
    }
}

impl Default for LikeTimingWeights {
    fn default() -> Self {
        Self {
            immediate: 0.02,
            middle: 0.35,
            after: 0.45,
            delayed: 0.18,
        }
    }
}

/// Like and comment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub like_rate_min: f64,
    pub like_rate_max: f64,
    pub comment_rate_min: f64,
    pub comment_rate_max: f64,
    pub like_timing: LikeTimingWeights,
    pub immediate_min_secs: f64,
    pub immediate_max_secs: f64,
    pub middle_min_fraction: f64,
    pub middle_max_fraction: f64,
    pub after_min_secs: f64,
    pub after_max_secs: f64,
    pub delayed_min_secs: f64,
    pub delayed_max_secs: f64,
    pub comment_delay_min_secs: f64,
    pub comment_delay_max_secs: f64,
    /// Comment texts. An empty list disables commenting.
    pub comment_templates: Vec<String>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            like_rate_min: 0.20,
            like_rate_max: 0.70,
            comment_rate_min: 0.10,
            comment_rate_max: 0.50,
            like_timing: LikeTimingWeights::default(),
            immediate_min_secs: 3.0,
            immediate_max_secs: 5.0,
            middle_min_fraction: 0.4,
            middle_max_fraction: 0.6,
            after_min_secs: 1.0,
            after_max_secs: 3.0,
            delayed_min_secs: 10.0,
            delayed_max_secs: 30.0,
            comment_delay_min_secs: 5.0,
            comment_delay_max_secs: 15.0,
            comment_templates: [
                "Great video!",
                "Really helpful, thanks",
                "Thanks for sharing this",
                "Learned something new today",
                "Nice one 👍",
                "Well explained!",
                "This was worth watching",
                "Looking forward to the next one",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Tap geometry and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    /// Standard deviation of the tap position as a fraction of the box size.
    pub position_std_ratio: f64,
    pub margin_px: f64,
    pub duration_mean_ms: f64,
    pub duration_std_ms: f64,
    pub duration_min_ms: f64,
    pub duration_max_ms: f64,
    pub double_tap_interval_min_ms: u32,
    pub double_tap_interval_max_ms: u32,
    /// Long press duration jitter, applied symmetrically.
    pub long_press_jitter_ms: u32,
    /// Pause between consecutive taps of a sequence.
    pub sequence_interval_min_ms: u32,
    pub sequence_interval_max_ms: u32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            position_std_ratio: 0.167,
            margin_px: 5.0,
            duration_mean_ms: 100.0,
            duration_std_ms: 30.0,
            duration_min_ms: 50.0,
            duration_max_ms: 200.0,
            double_tap_interval_min_ms: 100,
            double_tap_interval_max_ms: 300,
            long_press_jitter_ms: 50,
            sequence_interval_min_ms: 200,
            sequence_interval_max_ms: 500,
        }
    }
}

/// One shorts-style dwell band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellBand {
    pub name: String,
    pub weight: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DwellBand {
    pub fn new(name: impl Into<String>, weight: f64, min_secs: f64, max_secs: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            min_secs,
            max_secs,
        }
    }
}

/// Swipe and scroll settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub duration_min_ms: u32,
    pub duration_max_ms: u32,
    pub easing: Easing,
    pub noise_enabled: bool,
    pub noise_std_px: f64,
    pub pause_after_min_ms: u32,
    pub pause_after_max_ms: u32,
    /// Vertical start of a scroll as a fraction of screen height.
    pub scroll_start_ratio: f64,
    /// Vertical end of a scroll as a fraction of screen height.
    pub scroll_end_ratio: f64,
    /// Horizontal jitter as a fraction of screen width.
    pub x_jitter_ratio: f64,
    pub dwell_bands: Vec<DwellBand>,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            duration_min_ms: 200,
            duration_max_ms: 600,
            easing: Easing::EaseInOut,
            noise_enabled: true,
            noise_std_px: 2.0,
            pause_after_min_ms: 500,
            pause_after_max_ms: 2000,
            scroll_start_ratio: 0.7,
            scroll_end_ratio: 0.3,
            x_jitter_ratio: 0.1,
            dwell_bands: vec![
                DwellBand::new("instant_skip", 0.25, 0.5, 1.5),
                DwellBand::new("short_view", 0.30, 1.5, 3.5),
                DwellBand::new("mid_view", 0.28, 3.5, 10.0),
                DwellBand::new("full_view", 0.17, 10.0, 30.0),
            ],
        }
    }
}

/// Keystroke timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub char_delay_mean_ms: f64,
    pub char_delay_std_ms: f64,
    pub char_delay_min_ms: f64,
    pub char_delay_max_ms: f64,
    pub word_pause_min_ms: u32,
    pub word_pause_max_ms: u32,
    pub think_probability: f64,
    pub think_pause_min_ms: u32,
    pub think_pause_max_ms: u32,
    pub typo_probability: f64,
    pub typo_fix_delay_min_ms: u32,
    pub typo_fix_delay_max_ms: u32,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            char_delay_mean_ms: 120.0,
            char_delay_std_ms: 40.0,
            char_delay_min_ms: 80.0,
            char_delay_max_ms: 200.0,
            word_pause_min_ms: 100,
            word_pause_max_ms: 400,
            think_probability: 0.1,
            think_pause_min_ms: 500,
            think_pause_max_ms: 2000,
            typo_probability: 0.03,
            typo_fix_delay_min_ms: 100,
            typo_fix_delay_max_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PatternConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: PatternConfig =
            serde_json::from_str(r#"{"watch": {"full_watch_probability": 0.5}}"#).unwrap();
        assert_eq!(config.watch.full_watch_probability, 0.5);
        assert_eq!(config.watch.min_watch_secs, 10);
        assert_eq!(config.scroll.dwell_bands.len(), 4);
    }

    #[test]
    fn test_rejects_bad_like_weights() {
        let mut config = PatternConfig::default();
        config.interaction.like_timing.delayed = 0.5;
        assert!(matches!(config.validate(), Err(PatternError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_seek_range() {
        let mut config = PatternConfig::default();
        config.watch.seek_count_min = 30;
        assert!(config.validate().is_err());
    }
}
