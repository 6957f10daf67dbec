//! Like and comment decisions with their timestamps.

use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::error::PatternError;
use crate::random::RandomSource;

/// When during the session a like happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeBucket {
    /// A few seconds in.
    Immediate,
    /// Around the middle of the watch.
    Middle,
    /// Just after the watch ends.
    After,
    /// Well after the watch ends.
    Delayed,
}

impl LikeBucket {
    pub const ALL: [LikeBucket; 4] = [Self::Immediate, Self::Middle, Self::After, Self::Delayed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Middle => "middle",
            Self::After => "after",
            Self::Delayed => "delayed",
        }
    }
}

/// Per-session like and comment plan. Offsets are seconds from playback start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPattern {
    pub like_probability: f64,
    pub comment_probability: f64,
    pub should_like: bool,
    pub like_bucket: Option<LikeBucket>,
    pub like_at: Option<u32>,
    pub should_comment: bool,
    pub comment_at: Option<u32>,
    pub comment_text: Option<String>,
}

impl InteractionPattern {
    /// Latest scheduled interaction offset, if any.
    pub fn last_offset(&self) -> Option<u32> {
        self.like_at.into_iter().chain(self.comment_at).max()
    }
}

/// Draw the like and comment plan for a session of `watch_time` seconds.
pub fn generate<S: RandomSource>(
    rng: &mut S,
    config: &InteractionConfig,
    watch_time: u32,
) -> InteractionPattern {
    let like_probability = rng.uniform(config.like_rate_min, config.like_rate_max);
    let should_like = rng.chance(like_probability);
    let comment_probability = rng.uniform(config.comment_rate_min, config.comment_rate_max);
    let should_comment = rng.chance(comment_probability) && !config.comment_templates.is_empty();

    let (like_bucket, like_at) = if should_like {
        let bucket = like_bucket(rng, config);
        (Some(bucket), Some(like_offset(rng, config, bucket, watch_time)))
    } else {
        (None, None)
    };

    let (comment_at, comment_text) = if should_comment {
        let at = (watch_time as f64
            + rng.uniform(config.comment_delay_min_secs, config.comment_delay_max_secs))
        .floor() as u32;
        (Some(at), rng.pick(&config.comment_templates).cloned())
    } else {
        (None, None)
    };

    InteractionPattern {
        like_probability,
        comment_probability,
        should_like,
        like_bucket,
        like_at,
        should_comment,
        comment_at,
        comment_text,
    }
}

/// One uniform draw against the cumulative bucket weights.
pub fn like_bucket<S: RandomSource>(rng: &mut S, config: &InteractionConfig) -> LikeBucket {
    let w = &config.like_timing;
    let r = rng.next_unit();
    if r < w.immediate {
        LikeBucket::Immediate
    } else if r < w.immediate + w.middle {
        LikeBucket::Middle
    } else if r < w.immediate + w.middle + w.after {
        LikeBucket::After
    } else {
        LikeBucket::Delayed
    }
}

fn like_offset<S: RandomSource>(
    rng: &mut S,
    config: &InteractionConfig,
    bucket: LikeBucket,
    watch_time: u32,
) -> u32 {
    let wt = watch_time as f64;
    let offset = match bucket {
        LikeBucket::Immediate => {
            let hi = config.immediate_max_secs.min(wt).max(config.immediate_min_secs);
            rng.uniform(config.immediate_min_secs, hi)
        }
        LikeBucket::Middle => {
            wt * rng.uniform(config.middle_min_fraction, config.middle_max_fraction)
        }
        LikeBucket::After => wt + rng.uniform(config.after_min_secs, config.after_max_secs),
        LikeBucket::Delayed => wt + rng.uniform(config.delayed_min_secs, config.delayed_max_secs),
    };
    offset.floor() as u32
}

/// Observed like and comment rates over many sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRates {
    pub samples: usize,
    pub like_rate: f64,
    pub comment_rate: f64,
    /// Like bucket frequencies among liked sessions, in `LikeBucket::ALL` order.
    pub bucket_rates: [f64; 4],
}

/// Simulate `samples` sessions and report observed rates.
pub fn simulate<S: RandomSource>(
    rng: &mut S,
    config: &InteractionConfig,
    watch_time: u32,
    samples: usize,
) -> Result<InteractionRates, PatternError> {
    if samples == 0 {
        return Err(PatternError::InvalidConfig("samples must be positive".into()));
    }
    let mut likes = 0usize;
    let mut comments = 0usize;
    let mut buckets = [0usize; 4];
    for _ in 0..samples {
        let pattern = generate(rng, config, watch_time);
        if pattern.should_comment {
            comments += 1;
        }
        if let Some(bucket) = pattern.like_bucket {
            likes += 1;
            buckets[bucket as usize] += 1;
        }
    }
    let n = samples as f64;
    let liked = likes.max(1) as f64;
    Ok(InteractionRates {
        samples,
        like_rate: likes as f64 / n,
        comment_rate: comments as f64 / n,
        bucket_rates: buckets.map(|c| c as f64 / liked),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RandomModel;

    #[test]
    fn test_bucket_frequencies_match_weights() {
        let mut rng = RandomModel::seeded(21);
        let config = InteractionConfig::default();
        let mut counts = [0usize; 4];
        let n = 10_000;
        for _ in 0..n {
            counts[like_bucket(&mut rng, &config) as usize] += 1;
        }
        let expected = [0.02, 0.35, 0.45, 0.18];
        for (count, want) in counts.iter().zip(expected) {
            let observed = *count as f64 / n as f64;
            assert!((observed - want).abs() <= 0.02, "observed {observed}, want {want}");
        }
    }

    #[test]
    fn test_offsets_follow_bucket_rules() {
        let mut rng = RandomModel::seeded(22);
        let config = InteractionConfig::default();
        let watch_time = 200;
        for _ in 0..5_000 {
            let p = generate(&mut rng, &config, watch_time);
            assert_eq!(p.should_like, p.like_at.is_some());
            if let (Some(bucket), Some(at)) = (p.like_bucket, p.like_at) {
                match bucket {
                    LikeBucket::Immediate => assert!((3..=5).contains(&at)),
                    LikeBucket::Middle => assert!((80..=120).contains(&at)),
                    LikeBucket::After => assert!((201..=203).contains(&at)),
                    LikeBucket::Delayed => assert!((210..=230).contains(&at)),
                }
            }
            if let Some(at) = p.comment_at {
                assert!((205..=215).contains(&at));
                assert!(p.comment_text.is_some());
            }
            assert!((0.2..0.7).contains(&p.like_probability));
            assert!((0.1..0.5).contains(&p.comment_probability));
        }
    }

    #[test]
    fn test_immediate_like_on_short_watch() {
        let mut rng = RandomModel::seeded(23);
        let config = InteractionConfig::default();
        for _ in 0..1_000 {
            let at = like_offset(&mut rng, &config, LikeBucket::Immediate, 4);
            assert!((3..=4).contains(&at));
        }
    }

    #[test]
    fn test_no_templates_disables_comments() {
        let mut rng = RandomModel::seeded(24);
        let config = InteractionConfig {
            comment_rate_min: 1.0,
            comment_rate_max: 1.0,
            comment_templates: Vec::new(),
            ..Default::default()
        };
        let p = generate(&mut rng, &config, 60);
        assert!(!p.should_comment);
        assert!(p.comment_at.is_none());
    }

    #[test]
    fn test_simulated_rates_near_midpoints() {
        let mut rng = RandomModel::seeded(25);
        let rates = simulate(&mut rng, &InteractionConfig::default(), 120, 10_000).unwrap();
        assert!((rates.like_rate - 0.45).abs() < 0.03, "like rate {}", rates.like_rate);
        assert!((rates.comment_rate - 0.30).abs() < 0.03, "comment rate {}", rates.comment_rate);
    }

    #[test]
    fn test_last_offset() {
        let mut rng = RandomModel::seeded(26);
        let config = InteractionConfig {
            like_rate_min: 1.0,
            like_rate_max: 1.0,
            comment_rate_min: 1.0,
            comment_rate_max: 1.0,
            ..Default::default()
        };
        let p = generate(&mut rng, &config, 100);
        let last = p.last_offset().unwrap();
        assert!(last >= p.like_at.unwrap());
        assert!(last >= p.comment_at.unwrap());
    }
}
