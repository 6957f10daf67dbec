//! WatchFleet pattern engine.
//!
//! Synthesizes believable viewer sessions from probability distributions:
//! how long to watch, when to seek, whether and when to like or comment,
//! where exactly a finger lands on a button and how a swipe travels.
//!
//! Every generator draws from a [`RandomSource`], so a session is fully
//! reproducible from a seed via [`RandomModel::seeded`].

pub mod config;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod random;
pub mod swipe;
pub mod touch;
pub mod typing;
pub mod watch;

pub use config::{
    DwellBand, InteractionConfig, LikeTimingWeights, PatternConfig, ScrollConfig, TouchConfig,
    TypingConfig, WatchConfig,
};
pub use engine::{HumanPattern, PatternEngine};
pub use error::PatternError;
pub use interaction::{InteractionPattern, InteractionRates, LikeBucket};
pub use random::{RandomModel, RandomSource};
pub use swipe::{Easing, ScreenSize, SeekDirection, Swipe, SwipePoint};
pub use touch::{BoundingBox, DoubleTap, Point, SequencedTap, Tap};
pub use typing::{TypingEvent, TypingPlan};
pub use watch::{WatchDistribution, WatchPattern};
