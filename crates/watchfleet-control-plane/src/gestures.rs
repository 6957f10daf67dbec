//! Composite gestures built from pattern engine output.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use watchfleet_client::{ElementHandle, Key};
use watchfleet_pattern::{PatternEngine, ScreenSize, TypingEvent};

use crate::actuator::{Actuator, ActuatorError};
use crate::wait::{cancellable_sleep, Cancelled};

/// Errors raised by a composite gesture.
#[derive(Debug, Error)]
pub enum GestureError {
    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Natural tap somewhere inside the element.
pub async fn tap_element(
    actuator: &dyn Actuator,
    engine: &mut PatternEngine,
    element: &ElementHandle,
) -> Result<(), ActuatorError> {
    let tap = engine.tap(element.bounds);
    actuator.tap(&tap).await
}

/// Type `text` into `element` one keystroke at a time, following a typing plan.
pub async fn type_naturally(
    actuator: &dyn Actuator,
    engine: &mut PatternEngine,
    element: &ElementHandle,
    text: &str,
    cancel: &CancellationToken,
) -> Result<(), GestureError> {
    let plan = engine.typing_plan(text);
    let mut buf = [0u8; 4];
    for event in &plan.events {
        cancellable_sleep(cancel, Duration::from_millis(event.delay_ms() as u64)).await?;
        match event {
            TypingEvent::Key { ch, .. } => {
                actuator.type_text(element, ch.encode_utf8(&mut buf)).await?;
            }
            TypingEvent::Backspace { .. } => actuator.press_key(Key::Backspace).await?,
            TypingEvent::Pause { .. } => {}
        }
    }
    Ok(())
}

/// Scroll one page down and wait out the post-swipe pause.
pub async fn scroll_page(
    actuator: &dyn Actuator,
    engine: &mut PatternEngine,
    screen: ScreenSize,
    cancel: &CancellationToken,
) -> Result<(), GestureError> {
    let swipe = engine.scroll_down(screen);
    actuator.swipe(&swipe).await?;
    cancellable_sleep(cancel, Duration::from_millis(swipe.pause_after_ms as u64)).await?;
    Ok(())
}
