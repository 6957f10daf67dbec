//! Swipe trajectories, scrolling and shorts dwell time.

use serde::{Deserialize, Serialize};

use crate::config::ScrollConfig;
use crate::random::RandomSource;
use crate::touch::Point;

/// Interpolation curve for swipe progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    /// Smoothstep, `t^2 (3 - 2t)`.
    #[default]
    EaseInOut,
    /// Smootherstep, `t^3 (t (6t - 15) + 10)`.
    Bezier,
}

impl Easing {
    /// Map normalized time in `[0, 1]` to normalized progress. Fixes 0 and 1.
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => t * t * (3.0 - 2.0 * t),
            Self::Bezier => t * t * t * (t * (6.0 * t - 15.0) + 10.0),
        }
    }
}

/// Screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 2280,
        }
    }
}

/// One sampled position along a swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipePoint {
    pub x: i32,
    pub y: i32,
    /// Milliseconds since the swipe started.
    pub timestamp_ms: u32,
}

/// A full swipe gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swipe {
    pub start: Point,
    pub end: Point,
    pub duration_ms: u32,
    pub points: Vec<SwipePoint>,
    /// Idle time after the gesture before the next action.
    pub pause_after_ms: u32,
}

/// Build a swipe from `start` to `end`. When `duration_ms` is `None` it is
/// drawn from the configured range.
pub fn generate<S: RandomSource>(
    rng: &mut S,
    config: &ScrollConfig,
    start: Point,
    end: Point,
    duration_ms: Option<u32>,
) -> Swipe {
    let duration_ms = duration_ms.unwrap_or_else(|| {
        rng.int_inclusive(config.duration_min_ms as i64, config.duration_max_ms as i64) as u32
    });
    let steps = (duration_ms / 10).max(5);

    let (sx, sy) = (start.x as f64, start.y as f64);
    let (dx, dy) = ((end.x - start.x) as f64, (end.y - start.y) as f64);

    let points = (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let e = config.easing.apply(t);
            let mut x = sx + dx * e;
            let mut y = sy + dy * e;
            if config.noise_enabled && i > 0 && i < steps {
                x += rng.gaussian(0.0, config.noise_std_px);
                y += rng.gaussian(0.0, config.noise_std_px);
            }
            SwipePoint {
                x: x.floor() as i32,
                y: y.floor() as i32,
                timestamp_ms: (duration_ms as u64 * i as u64 / steps as u64) as u32,
            }
        })
        .collect();

    let pause_after_ms = rng.int_inclusive(
        config.pause_after_min_ms as i64,
        config.pause_after_max_ms as i64,
    ) as u32;

    Swipe {
        start,
        end,
        duration_ms,
        points,
        pause_after_ms,
    }
}

fn scroll_endpoints<S: RandomSource>(
    rng: &mut S,
    config: &ScrollConfig,
    screen: ScreenSize,
) -> (Point, Point) {
    let cx = screen.width / 2;
    let jitter = (screen.width as f64 * config.x_jitter_ratio).floor() as i64;
    let low = (screen.height as f64 * config.scroll_start_ratio).round() as i32;
    let high = (screen.height as f64 * config.scroll_end_ratio).round() as i32;
    let x1 = cx + rng.int_inclusive(-jitter, jitter) as i32;
    let x2 = cx + rng.int_inclusive(-jitter, jitter) as i32;
    (Point::new(x1, low), Point::new(x2, high))
}

/// Finger moves up the screen, content scrolls down.
pub fn scroll_down<S: RandomSource>(rng: &mut S, config: &ScrollConfig, screen: ScreenSize) -> Swipe {
    let (low, high) = scroll_endpoints(rng, config, screen);
    generate(rng, config, low, high, None)
}

/// Finger moves down the screen, content scrolls up.
pub fn scroll_up<S: RandomSource>(rng: &mut S, config: &ScrollConfig, screen: ScreenSize) -> Swipe {
    let (low, high) = scroll_endpoints(rng, config, screen);
    generate(rng, config, high, low, None)
}

/// Side of the player a seek double-tap lands on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekDirection {
    #[default]
    Forward,
    Backward,
}

/// Seek gesture on a portrait player occupying 20%-60% of the screen height:
/// a 50 ms stationary swipe at three quarters (forward) or one quarter
/// (backward) of the width, vertically centred on the player.
pub fn seek_swipe<S: RandomSource>(
    rng: &mut S,
    config: &ScrollConfig,
    screen: ScreenSize,
    direction: SeekDirection,
) -> Swipe {
    let player_top = (screen.height as f64 * 0.2) as i32;
    let player_height = (screen.height as f64 * 0.4) as i32;
    let x_ratio = match direction {
        SeekDirection::Forward => 0.75,
        SeekDirection::Backward => 0.25,
    };
    let target = Point::new(
        (screen.width as f64 * x_ratio) as i32,
        player_top + player_height / 2,
    );
    generate(rng, config, target, target, Some(50))
}

/// Pick a dwell band by one cumulative draw, then a duration inside it.
/// Returns the band name and the dwell in seconds.
pub fn shorts_dwell<S: RandomSource>(rng: &mut S, config: &ScrollConfig) -> (String, f64) {
    let r = rng.next_unit();
    let mut cumulative = 0.0;
    let bands = &config.dwell_bands;
    let chosen = bands
        .iter()
        .find(|band| {
            cumulative += band.weight;
            r < cumulative
        })
        .or_else(|| bands.last());

    match chosen {
        Some(band) => (band.name.clone(), rng.uniform(band.min_secs, band.max_secs)),
        None => (String::new(), 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RandomModel;

    #[test]
    fn test_easing_fixes_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::Bezier,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert_eq!(Easing::EaseInOut.apply(0.5), 0.5);
    }

    #[test]
    fn test_swipe_endpoints_exact() {
        let mut rng = RandomModel::seeded(41);
        let config = ScrollConfig::default();
        let start = Point::new(540, 1596);
        let end = Point::new(530, 684);
        for _ in 0..500 {
            let swipe = generate(&mut rng, &config, start, end, None);
            let first = swipe.points.first().unwrap();
            let last = swipe.points.last().unwrap();
            assert_eq!((first.x, first.y), (start.x, start.y));
            assert_eq!((last.x, last.y), (end.x, end.y));
            assert_eq!(first.timestamp_ms, 0);
            assert_eq!(last.timestamp_ms, swipe.duration_ms);
            assert!((200..=600).contains(&swipe.duration_ms));
            assert!((500..=2000).contains(&swipe.pause_after_ms));
        }
    }

    #[test]
    fn test_waypoint_count() {
        let mut rng = RandomModel::seeded(42);
        let config = ScrollConfig::default();
        let a = Point::new(0, 0);
        let b = Point::new(0, 100);
        assert_eq!(generate(&mut rng, &config, a, b, Some(300)).points.len(), 31);
        assert_eq!(generate(&mut rng, &config, a, b, Some(20)).points.len(), 6);
    }

    #[test]
    fn test_noise_free_path_is_monotone() {
        let mut rng = RandomModel::seeded(43);
        let config = ScrollConfig {
            noise_enabled: false,
            ..Default::default()
        };
        let swipe = generate(&mut rng, &config, Point::new(0, 1000), Point::new(0, 0), Some(400));
        for pair in swipe.points.windows(2) {
            assert!(pair[1].y <= pair[0].y);
            assert!(pair[1].timestamp_ms >= pair[0].timestamp_ms);
        }
    }

    #[test]
    fn test_scroll_down_geometry() {
        let mut rng = RandomModel::seeded(44);
        let config = ScrollConfig::default();
        let screen = ScreenSize::default();
        let swipe = scroll_down(&mut rng, &config, screen);
        assert_eq!(swipe.start.y, 1596);
        assert_eq!(swipe.end.y, 684);
        assert!((432..=648).contains(&swipe.start.x));
        let up = scroll_up(&mut rng, &config, screen);
        assert!(up.start.y < up.end.y);
    }

    #[test]
    fn test_dwell_band_frequencies() {
        let mut rng = RandomModel::seeded(45);
        let config = ScrollConfig::default();
        let n = 10_000;
        let mut counts = [0usize; 4];
        for _ in 0..n {
            let (name, secs) = shorts_dwell(&mut rng, &config);
            let idx = config.dwell_bands.iter().position(|b| b.name == name).unwrap();
            let band = &config.dwell_bands[idx];
            assert!(secs >= band.min_secs && secs < band.max_secs);
            counts[idx] += 1;
        }
        for (count, band) in counts.iter().zip(&config.dwell_bands) {
            let observed = *count as f64 / n as f64;
            assert!((observed - band.weight).abs() <= 0.02, "{} {observed}", band.name);
        }
    }

    #[test]
    fn test_seek_swipe_targets_player_side() {
        let mut rng = RandomModel::seeded(47);
        let config = ScrollConfig::default();
        let screen = ScreenSize::default();

        let forward = seek_swipe(&mut rng, &config, screen, SeekDirection::Forward);
        assert_eq!(forward.start, Point::new(810, 912));
        assert_eq!(forward.end, forward.start);
        assert_eq!(forward.duration_ms, 50);
        assert_eq!(forward.points.len(), 6);
        assert_eq!(forward.points.last().unwrap().timestamp_ms, 50);

        let backward = seek_swipe(&mut rng, &config, screen, SeekDirection::Backward);
        assert_eq!(backward.start, Point::new(270, 912));
    }
}
