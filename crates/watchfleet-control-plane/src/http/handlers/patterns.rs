//! Pattern generation handlers.
//!
//! Each request draws from a fresh engine over the configured pattern tables.
//! A `seed` makes the response reproducible.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use watchfleet_pattern::{
    DoubleTap, InteractionPattern, InteractionRates, PatternEngine, RandomModel, SequencedTap,
    Swipe, Tap, TypingPlan, WatchDistribution, WatchPattern,
};

use crate::http::responses::{
    ApiError, InteractionRatesQuery, InteractionRequest, PatternRequest, PatternResponse,
    ScrollDirection, ScrollRequest, SeedQuery, SeekRequest, ShortsTimingResponse, SwipeRequest,
    TapSequenceRequest, TouchRequest, TypingRequest, WatchDistributionQuery, MAX_SAMPLES,
};
use crate::scheduler::Scheduler;

fn engine(scheduler: &Scheduler, seed: Option<u64>) -> PatternEngine {
    let config = scheduler.config().pattern.clone();
    match seed {
        Some(seed) => PatternEngine::seeded(config, seed),
        None => PatternEngine::new(config, RandomModel::from_entropy()),
    }
}

fn check_samples(samples: usize) -> Result<(), ApiError> {
    if samples == 0 || samples > MAX_SAMPLES {
        return Err(ApiError::bad_request(format!(
            "samples must be between 1 and {MAX_SAMPLES}"
        )));
    }
    Ok(())
}

/// Watch and interaction plan for one session.
pub async fn generate_pattern(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<PatternRequest>,
) -> Result<Json<PatternResponse>, ApiError> {
    let pattern = engine(&scheduler, req.seed).human_pattern(req.duration)?;
    Ok(Json(PatternResponse {
        session_length: pattern.session_length(),
        pattern,
    }))
}

pub async fn watch_pattern(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<PatternRequest>,
) -> Result<Json<WatchPattern>, ApiError> {
    Ok(Json(engine(&scheduler, req.seed).watch_pattern(req.duration)?))
}

pub async fn interaction_pattern(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<InteractionRequest>,
) -> Json<InteractionPattern> {
    Json(engine(&scheduler, req.seed).interaction_pattern(req.watch_time))
}

pub async fn tap(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<TouchRequest>,
) -> Json<Tap> {
    Json(engine(&scheduler, req.seed).tap(req.bbox))
}

pub async fn double_tap(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<TouchRequest>,
) -> Json<DoubleTap> {
    Json(engine(&scheduler, req.seed).double_tap(req.bbox))
}

pub async fn long_press(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<TouchRequest>,
) -> Json<Tap> {
    Json(engine(&scheduler, req.seed).long_press(req.bbox, req.press_ms))
}

pub async fn tap_sequence(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<TapSequenceRequest>,
) -> Json<Vec<SequencedTap>> {
    Json(engine(&scheduler, req.seed).tap_sequence(&req.boxes))
}

pub async fn swipe(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<SwipeRequest>,
) -> Json<Swipe> {
    Json(engine(&scheduler, req.seed).swipe(req.start, req.end, req.duration_ms))
}

pub async fn scroll(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<ScrollRequest>,
) -> Json<Swipe> {
    let mut engine = engine(&scheduler, req.seed);
    Json(match req.direction {
        ScrollDirection::Down => engine.scroll_down(req.screen),
        ScrollDirection::Up => engine.scroll_up(req.screen),
    })
}

/// Double-tap seek on the left or right of the player.
pub async fn seek(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<SeekRequest>,
) -> Json<Swipe> {
    Json(engine(&scheduler, req.seed).seek_swipe(req.screen, req.direction))
}

pub async fn typing(
    State(scheduler): State<Arc<Scheduler>>,
    Json(req): Json<TypingRequest>,
) -> Json<TypingPlan> {
    Json(engine(&scheduler, req.seed).typing_plan(&req.text))
}

pub async fn shorts_timing(
    State(scheduler): State<Arc<Scheduler>>,
    Query(query): Query<SeedQuery>,
) -> Json<ShortsTimingResponse> {
    let (band, timing_seconds) = engine(&scheduler, query.seed).shorts_dwell();
    Json(ShortsTimingResponse {
        band,
        timing_seconds,
    })
}

pub async fn watch_distribution(
    State(scheduler): State<Arc<Scheduler>>,
    Query(query): Query<WatchDistributionQuery>,
) -> Result<Json<WatchDistribution>, ApiError> {
    check_samples(query.samples)?;
    let distribution = engine(&scheduler, query.seed)
        .simulate_watch_distribution(query.duration, query.samples)?;
    Ok(Json(distribution))
}

pub async fn interaction_rates(
    State(scheduler): State<Arc<Scheduler>>,
    Query(query): Query<InteractionRatesQuery>,
) -> Result<Json<InteractionRates>, ApiError> {
    check_samples(query.samples)?;
    let rates = engine(&scheduler, query.seed)
        .simulate_interaction_rates(query.watch_time, query.samples)?;
    Ok(Json(rates))
}
