//! Watch duration and seek timing.

use serde::{Deserialize, Serialize};

use crate::config::WatchConfig;
use crate::error::PatternError;
use crate::random::{bounded, RandomSource};

/// How long to watch a video and where to seek.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchPattern {
    /// Seconds to watch, `min_watch_secs.min(duration) ..= duration`.
    pub watch_time: u32,
    /// `watch_time / duration * 100`, rounded to two decimals.
    pub watch_percent: f64,
    /// Number of seeks drawn for this session.
    pub seek_count: u32,
    /// Seek offsets in seconds, strictly increasing.
    pub seek_timings: Vec<u32>,
    /// Whether the full-watch branch was taken.
    pub full_watch: bool,
}

/// Generate a watch pattern for a video of `duration` seconds.
pub fn generate<S: RandomSource>(
    rng: &mut S,
    config: &WatchConfig,
    duration: u32,
) -> Result<WatchPattern, PatternError> {
    if duration == 0 {
        return Err(PatternError::InvalidDuration(duration));
    }
    let total = duration as f64;

    let full_watch = rng.chance(config.full_watch_probability);
    let watch_time = if full_watch {
        duration
    } else {
        let ratio = rng.beta(config.beta_alpha, config.beta_beta);
        (ratio * total)
            .max(config.min_watch_secs as f64)
            .min(total)
            .floor() as u32
    };

    let watch_percent = (watch_time as f64 / total * 100.0 * 100.0).round() / 100.0;

    let (seek_count, seek_timings) =
        if config.seek_enabled && watch_time > config.seek_threshold_secs {
            let count =
                rng.int_inclusive(config.seek_count_min as i64, config.seek_count_max as i64) as u32;
            (count, seek_timings(rng, config, watch_time, count))
        } else {
            (0, Vec::new())
        };

    Ok(WatchPattern {
        watch_time,
        watch_percent,
        seek_count,
        seek_timings,
        full_watch,
    })
}

/// Spread `count` seeks evenly over the watch, each jittered and clamped into
/// `[seek_floor_secs, watch_time - seek_tail_margin_secs]`.
pub fn seek_timings<S: RandomSource>(
    rng: &mut S,
    config: &WatchConfig,
    watch_time: u32,
    count: u32,
) -> Vec<u32> {
    if count == 0 {
        return Vec::new();
    }
    let lo = config.seek_floor_secs as f64;
    let hi = watch_time.saturating_sub(config.seek_tail_margin_secs) as f64;
    let interval = watch_time as f64 / (count + 1) as f64;
    let jitter = interval * config.seek_jitter_ratio;

    let mut timings: Vec<u32> = (1..=count)
        .map(|k| {
            let base = interval * k as f64;
            let t = base + rng.uniform(-jitter, jitter);
            bounded(t, lo, hi).floor() as u32
        })
        .collect();
    timings.sort_unstable();
    timings.dedup();
    timings
}

/// Summary of many simulated watch patterns for one duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchDistribution {
    pub samples: usize,
    pub mean_watch_secs: f64,
    pub median_watch_secs: f64,
    pub p25_watch_secs: f64,
    pub p75_watch_secs: f64,
    pub p90_watch_secs: f64,
    pub mean_watch_percent: f64,
    /// Fraction of samples that watched the whole video.
    pub full_watch_rate: f64,
}

/// Draw `samples` watch patterns and summarize them.
pub fn simulate<S: RandomSource>(
    rng: &mut S,
    config: &WatchConfig,
    duration: u32,
    samples: usize,
) -> Result<WatchDistribution, PatternError> {
    if samples == 0 {
        return Err(PatternError::InvalidConfig("samples must be positive".into()));
    }

    let mut times = Vec::with_capacity(samples);
    let mut percent_sum = 0.0;
    let mut full = 0usize;
    for _ in 0..samples {
        let pattern = generate(rng, config, duration)?;
        if pattern.watch_time == duration {
            full += 1;
        }
        percent_sum += pattern.watch_percent;
        times.push(pattern.watch_time as f64);
    }
    times.sort_by(|a, b| a.total_cmp(b));

    let n = samples as f64;
    Ok(WatchDistribution {
        samples,
        mean_watch_secs: times.iter().sum::<f64>() / n,
        median_watch_secs: percentile(&times, 0.50),
        p25_watch_secs: percentile(&times, 0.25),
        p75_watch_secs: percentile(&times, 0.75),
        p90_watch_secs: percentile(&times, 0.90),
        mean_watch_percent: percent_sum / n,
        full_watch_rate: full as f64 / n,
    })
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
