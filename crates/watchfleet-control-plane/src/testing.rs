//! Test doubles: a scripted in-memory actuator and stub aggregator ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use watchfleet_client::{ClientError, ElementHandle, Key, Selector};
use watchfleet_core::{Device, SessionResult, VideoListing};
use watchfleet_pattern::{BoundingBox, DoubleTap, Swipe, Tap};

use crate::actuator::{Actuator, ActuatorError, ActuatorProvider};
use crate::boundary::{ResultReporter, VideoSource};

pub fn element(id: &str, text: &str) -> ElementHandle {
    ElementHandle {
        id: id.to_string(),
        bounds: BoundingBox::new(40, 300, 1000, 180),
        text: Some(text.to_string()).filter(|t| !t.is_empty()),
    }
}

#[derive(Default)]
struct Script {
    /// Selector values that resolve to an element.
    elements: HashMap<String, ElementHandle>,
    /// Result pages returned after each submitted search.
    pages: Vec<Vec<ElementHandle>>,
    cursor: usize,
    player_duration: Option<u32>,
    fail_launch: bool,
    log: Vec<String>,
}

/// Actuator that answers from a script and records every call.
#[derive(Default)]
pub struct FakeActuator {
    script: Mutex<Script>,
}

impl FakeActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make selectors with this value resolvable.
    pub fn with_element(self, value: &str) -> Self {
        self.lock()
            .elements
            .insert(value.to_string(), element(value, value));
        self
    }

    /// Every selector value the session and discovery code looks up.
    pub fn with_full_ui(self) -> Self {
        [
            crate::discovery::SEARCH_BUTTON,
            crate::discovery::SEARCH_FIELD,
            crate::discovery::FILTER_BUTTON,
            crate::discovery::FILTER_APPLY,
            "Last hour",
            crate::session::LIKE_BUTTON,
            crate::session::COMMENTS_ENTRY,
            crate::session::COMMENT_INPUT,
            crate::session::COMMENT_SEND,
        ]
        .into_iter()
        .fold(self, |a, value| a.with_element(value))
    }

    /// Append one page of search results with the given titles.
    pub fn with_results_page(self, titles: &[&str]) -> Self {
        {
            let mut script = self.lock();
            let page = script.pages.len();
            let items = titles
                .iter()
                .enumerate()
                .map(|(i, t)| element(&format!("result-{page}-{i}"), t))
                .collect();
            script.pages.push(items);
        }
        self
    }

    pub fn with_player_duration(self, secs: u32) -> Self {
        self.lock().player_duration = Some(secs);
        self
    }

    pub fn failing_launch(self) -> Self {
        self.lock().fail_launch = true;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.lock().log.push(call);
    }

    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Number of calls whose log entry starts with `prefix`.
    pub fn calls(&self, prefix: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Text typed so far, with backspaces applied.
    pub fn typed(&self) -> String {
        let mut out = String::new();
        for call in self.lock().log.iter() {
            if let Some(text) = call.strip_prefix("type:") {
                out.push_str(text);
            } else if call == "key:backspace" {
                out.pop();
            }
        }
        out
    }
}

#[async_trait]
impl Actuator for FakeActuator {
    async fn tap(&self, tap: &Tap) -> Result<(), ActuatorError> {
        self.record(format!("tap:{},{}", tap.point.x, tap.point.y));
        Ok(())
    }

    async fn double_tap(&self, tap: &DoubleTap) -> Result<(), ActuatorError> {
        self.record(format!("double_tap:{},{}", tap.first.point.x, tap.first.point.y));
        Ok(())
    }

    async fn swipe(&self, swipe: &Swipe) -> Result<(), ActuatorError> {
        self.record(format!("swipe:{}", swipe.points.len()));
        let mut script = self.lock();
        script.cursor += 1;
        Ok(())
    }

    async fn type_text(&self, _element: &ElementHandle, text: &str) -> Result<(), ActuatorError> {
        self.record(format!("type:{text}"));
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<(), ActuatorError> {
        let mut script = self.lock();
        match key {
            Key::Enter => {
                script.log.push("key:enter".into());
                script.cursor = 0;
            }
            Key::Backspace => script.log.push("key:backspace".into()),
        }
        Ok(())
    }

    async fn find_element(
        &self,
        selectors: &[Selector],
        _timeout_ms: u64,
    ) -> Result<Option<ElementHandle>, ActuatorError> {
        let mut script = self.lock();
        let found = selectors
            .iter()
            .find_map(|s| script.elements.get(&s.value).cloned());
        let first = selectors.first().map(|s| s.value.clone()).unwrap_or_default();
        script.log.push(format!("find:{first}:{}", found.is_some()));
        Ok(found)
    }

    async fn visible_results(&self) -> Result<Vec<ElementHandle>, ActuatorError> {
        let mut script = self.lock();
        let page = script.pages.get(script.cursor).cloned().unwrap_or_default();
        script.log.push(format!("results:{}", page.len()));
        Ok(page)
    }

    async fn back(&self) -> Result<(), ActuatorError> {
        self.record("back".into());
        Ok(())
    }

    async fn home(&self) -> Result<(), ActuatorError> {
        self.record("home".into());
        Ok(())
    }

    async fn launch_app(&self, package: &str) -> Result<(), ActuatorError> {
        self.record(format!("launch:{package}"));
        if self.lock().fail_launch {
            return Err(ActuatorError::Unavailable("launch failed".into()));
        }
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<(), ActuatorError> {
        self.record(format!("open_url:{url}"));
        Ok(())
    }

    async fn read_player_duration(&self) -> Result<Option<u32>, ActuatorError> {
        self.record("player_duration".into());
        Ok(self.lock().player_duration)
    }

    async fn capture_screen(&self) -> Result<String, ActuatorError> {
        self.record("screenshot".into());
        Ok("/sdcard/watchfleet/shot.png".into())
    }
}

/// Provider handing the same fake actuator to every device.
pub struct FakeProvider {
    pub actuator: Arc<FakeActuator>,
}

impl FakeProvider {
    pub fn new(actuator: FakeActuator) -> Self {
        Self {
            actuator: Arc::new(actuator),
        }
    }
}

impl ActuatorProvider for FakeProvider {
    fn actuator(&self, _device: &Device) -> Arc<dyn Actuator> {
        self.actuator.clone()
    }
}

/// Video source returning a fixed listing, or failing.
pub struct StubSource {
    pub listings: Mutex<Vec<VideoListing>>,
    pub fail: bool,
    pub fetches: AtomicUsize,
}

impl StubSource {
    pub fn new(listings: Vec<VideoListing>) -> Self {
        Self {
            listings: Mutex::new(listings),
            fail: false,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl VideoSource for StubSource {
    async fn fetch_videos(&self) -> Result<Vec<VideoListing>, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ClientError::Status {
                status: 503,
                path: "/videos".into(),
            });
        }
        Ok(std::mem::take(&mut *self.listings.lock().unwrap()))
    }
}

/// Reporter that records results; fails the first `failures` submissions.
#[derive(Default)]
pub struct RecordingReporter {
    pub results: Mutex<Vec<SessionResult>>,
    pub failures: AtomicUsize,
    pub attempts: AtomicUsize,
    /// Time each submission takes.
    pub latency: std::time::Duration,
}

impl RecordingReporter {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            ..Default::default()
        }
    }

    pub fn slow(latency: std::time::Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn results(&self) -> Vec<SessionResult> {
        self.results.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultReporter for RecordingReporter {
    async fn submit(&self, result: &SessionResult) -> Result<(), ClientError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ClientError::Status {
                status: 502,
                path: "/results".into(),
            });
        }
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }
}
