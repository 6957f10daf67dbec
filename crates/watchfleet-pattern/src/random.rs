//! Seedable random primitives.
//!
//! [`RandomSource`] only requires a stream of uniform deviates in `[0, 1)`;
//! every distribution is derived from that stream so a fixed seed always
//! yields the same numbers, and tests can substitute scripted sources.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// A source of uniform deviates plus the distributions built on top of it.
pub trait RandomSource {
    /// Next uniform deviate in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform real in `[min, max)`.
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_unit()
    }

    /// Uniform integer in `[min, max]`, both ends inclusive.
    fn int_inclusive(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        let offset = (self.next_unit() * span).floor() as i64;
        min + offset.min(max - min)
    }

    /// Bernoulli trial succeeding with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Normal deviate via Box-Muller. Each call consumes two fresh uniforms.
    fn gaussian(&mut self, mean: f64, std: f64) -> f64 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.next_unit();
        let u2 = self.next_unit();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std * z
    }

    /// Gamma(shape, 1) deviate using Marsaglia-Tsang.
    fn gamma(&mut self, shape: f64) -> f64 {
        if shape < 1.0 {
            let boosted = self.gamma(shape + 1.0);
            return boosted * self.next_unit().powf(1.0 / shape);
        }

        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();
        loop {
            let (x, v) = loop {
                let x = self.gaussian(0.0, 1.0);
                let v = 1.0 + c * x;
                if v > 0.0 {
                    break (x, v);
                }
            };
            let v = v * v * v;
            let u = self.next_unit();
            let x2 = x * x;

            if u < 1.0 - 0.0331 * x2 * x2 {
                return d * v;
            }
            if u.ln() < 0.5 * x2 + d * (1.0 - v + v.ln()) {
                return d * v;
            }
        }
    }

    /// Beta(alpha, beta) deviate as a ratio of two Gammas, in `[0, 1]`.
    fn beta(&mut self, alpha: f64, beta: f64) -> f64 {
        let a = self.gamma(alpha);
        let b = self.gamma(beta);
        a / (a + b)
    }

    /// Uniformly pick one element.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        let idx = self.int_inclusive(0, items.len() as i64 - 1) as usize;
        items.get(idx)
    }
}

/// Clamp into `[lo, hi]` without panicking when the range is empty; an empty
/// range collapses to its midpoint.
pub(crate) fn bounded(value: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi {
        (lo + hi) / 2.0
    } else {
        value.max(lo).min(hi)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Random model backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomModel<R = StdRng> {
    rng: R,
}

impl RandomModel<StdRng> {
    /// Reproducible model: the same seed always yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Model seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: RngCore> RandomModel<R> {
    /// Wrap any `rand` generator.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> RandomSource for RandomModel<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
