//! Tap geometry.

use serde::{Deserialize, Serialize};

use crate::config::TouchConfig;
use crate::random::{bounded, RandomSource};

/// Screen coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned element bounds in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size centred on `center`.
    pub fn centered(center: Point, width: i32, height: i32) -> Self {
        Self {
            x: center.x - width / 2,
            y: center.y - height / 2,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// A single touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    pub point: Point,
    pub duration_ms: u32,
    /// Distance from the box centre, useful for calibration.
    pub offset: Point,
}

/// Two taps on the same target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoubleTap {
    pub first: Tap,
    pub second: Tap,
    pub interval_ms: u32,
}

/// Tap near the centre of `bbox`, never closer than the margin to its edge.
pub fn natural_tap<S: RandomSource>(rng: &mut S, config: &TouchConfig, bbox: BoundingBox) -> Tap {
    let (x, y) = (bbox.x as f64, bbox.y as f64);
    let (w, h) = (bbox.width as f64, bbox.height as f64);
    let cx = x + w / 2.0;
    let cy = y + h / 2.0;

    let tx = rng.gaussian(cx, w * config.position_std_ratio);
    let ty = rng.gaussian(cy, h * config.position_std_ratio);
    let m = config.margin_px;
    let tx = bounded(tx, x + m, x + w - m).floor() as i32;
    let ty = bounded(ty, y + m, y + h - m).floor() as i32;

    let duration = rng.gaussian(config.duration_mean_ms, config.duration_std_ms);
    let duration_ms = bounded(duration, config.duration_min_ms, config.duration_max_ms) as u32;

    Tap {
        point: Point::new(tx, ty),
        duration_ms,
        offset: Point::new(tx - cx.floor() as i32, ty - cy.floor() as i32),
    }
}

/// Two natural taps with a human inter-tap interval.
pub fn double_tap<S: RandomSource>(
    rng: &mut S,
    config: &TouchConfig,
    bbox: BoundingBox,
) -> DoubleTap {
    let first = natural_tap(rng, config, bbox);
    let second = natural_tap(rng, config, bbox);
    let interval_ms = rng.int_inclusive(
        config.double_tap_interval_min_ms as i64,
        config.double_tap_interval_max_ms as i64,
    ) as u32;
    DoubleTap {
        first,
        second,
        interval_ms,
    }
}

/// One tap of a sequence and the pause before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencedTap {
    pub tap: Tap,
    /// Zero for the last tap.
    pub interval_ms: u32,
}

/// Natural taps on each box in order, separated by human pauses.
pub fn tap_sequence<S: RandomSource>(
    rng: &mut S,
    config: &TouchConfig,
    boxes: &[BoundingBox],
) -> Vec<SequencedTap> {
    boxes
        .iter()
        .enumerate()
        .map(|(i, &bbox)| {
            let tap = natural_tap(rng, config, bbox);
            let interval_ms = if i + 1 < boxes.len() {
                rng.int_inclusive(
                    config.sequence_interval_min_ms as i64,
                    config.sequence_interval_max_ms as i64,
                ) as u32
            } else {
                0
            };
            SequencedTap { tap, interval_ms }
        })
        .collect()
}

/// Natural tap held for roughly `press_ms`.
pub fn long_press<S: RandomSource>(
    rng: &mut S,
    config: &TouchConfig,
    bbox: BoundingBox,
    press_ms: u32,
) -> Tap {
    let mut tap = natural_tap(rng, config, bbox);
    let jitter = config.long_press_jitter_ms as i64;
    let held = press_ms as i64 + rng.int_inclusive(-jitter, jitter);
    tap.duration_ms = held.max(1) as u32;
    tap
}
