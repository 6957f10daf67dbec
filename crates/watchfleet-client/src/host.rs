//! HTTP client for the device automation host.
//!
//! Every primitive is a JSON command: `POST {base}/devices/{serial}/{action}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use watchfleet_pattern::{BoundingBox, DoubleTap, Swipe, Tap};

use crate::error::ClientError;

/// How a selector matches an on-screen element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Resource id.
    Id,
    /// Exact visible text.
    Text,
    /// Visible text containing the value.
    TextContains,
    /// Accessibility description.
    Description,
}

/// Element lookup criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub by: SelectorKind,
    pub value: String,
}

impl Selector {
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            by: SelectorKind::Id,
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            by: SelectorKind::Text,
            value: value.into(),
        }
    }

    pub fn text_contains(value: impl Into<String>) -> Self {
        Self {
            by: SelectorKind::TextContains,
            value: value.into(),
        }
    }

    pub fn description(value: impl Into<String>) -> Self {
        Self {
            by: SelectorKind::Description,
            value: value.into(),
        }
    }
}

/// Reference to an element found on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Host-side handle, valid until the screen changes.
    pub id: String,
    pub bounds: BoundingBox,
    /// Visible text, if any.
    #[serde(default)]
    pub text: Option<String>,
}

/// Hardware-style key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Enter,
    Backspace,
}

#[derive(Debug, Deserialize)]
struct ElementResponse {
    #[serde(default)]
    element: Option<ElementHandle>,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    results: Vec<ElementHandle>,
}

#[derive(Debug, Deserialize)]
struct ScreenshotResponse {
    path: String,
}

#[derive(Debug, Deserialize)]
struct DurationResponse {
    #[serde(default)]
    duration: Option<u32>,
}

/// Client for one automation host. Devices are addressed by serial.
#[derive(Debug, Clone)]
pub struct AutomationHostClient {
    inner: reqwest::Client,
    base_url: String,
}

impl AutomationHostClient {
    /// Create a new automation host client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn command_path(serial: &str, action: &str) -> String {
        format!("/devices/{serial}/{action}")
    }

    /// Send one command and decode the JSON reply.
    pub async fn command<T: DeserializeOwned>(
        &self,
        serial: &str,
        action: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        let path = Self::command_path(serial, action);
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Host command");

        let response = self.inner.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                path,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Send one command whose reply carries nothing of interest.
    async fn fire(&self, serial: &str, action: &str, body: serde_json::Value) -> Result<(), ClientError> {
        let _: serde_json::Value = self.command(serial, action, body).await?;
        Ok(())
    }

    pub async fn tap(&self, serial: &str, tap: &Tap) -> Result<(), ClientError> {
        self.fire(
            serial,
            "tap",
            json!({ "x": tap.point.x, "y": tap.point.y, "duration_ms": tap.duration_ms }),
        )
        .await
    }

    pub async fn double_tap(&self, serial: &str, tap: &DoubleTap) -> Result<(), ClientError> {
        let body = serde_json::to_value(tap).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.fire(serial, "double_tap", body).await
    }

    pub async fn swipe(&self, serial: &str, swipe: &Swipe) -> Result<(), ClientError> {
        let body = json!({ "duration_ms": swipe.duration_ms, "points": swipe.points });
        self.fire(serial, "swipe", body).await
    }

    pub async fn type_text(
        &self,
        serial: &str,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), ClientError> {
        self.fire(serial, "type_text", json!({ "element": element.id, "text": text }))
            .await
    }

    pub async fn press_key(&self, serial: &str, key: Key) -> Result<(), ClientError> {
        self.fire(serial, "key", json!({ "key": key })).await
    }

    /// First element matching any selector, waiting up to `timeout_ms`.
    pub async fn find_element(
        &self,
        serial: &str,
        selectors: &[Selector],
        timeout_ms: u64,
    ) -> Result<Option<ElementHandle>, ClientError> {
        let reply: ElementResponse = self
            .command(
                serial,
                "find_element",
                json!({ "selectors": selectors, "timeout_ms": timeout_ms }),
            )
            .await?;
        Ok(reply.element)
    }

    /// Search result entries currently on screen, top to bottom.
    pub async fn visible_results(&self, serial: &str) -> Result<Vec<ElementHandle>, ClientError> {
        let reply: ResultsResponse = self.command(serial, "visible_results", json!({})).await?;
        Ok(reply.results)
    }

    pub async fn back(&self, serial: &str) -> Result<(), ClientError> {
        self.fire(serial, "back", json!({})).await
    }

    pub async fn home(&self, serial: &str) -> Result<(), ClientError> {
        self.fire(serial, "home", json!({})).await
    }

    pub async fn launch_app(&self, serial: &str, package: &str) -> Result<(), ClientError> {
        self.fire(serial, "launch_app", json!({ "package": package })).await
    }

    pub async fn open_url(&self, serial: &str, url: &str) -> Result<(), ClientError> {
        self.fire(serial, "open_url", json!({ "url": url })).await
    }

    /// Duration shown by the player, if it could be read.
    pub async fn read_player_duration(&self, serial: &str) -> Result<Option<u32>, ClientError> {
        let reply: DurationResponse = self.command(serial, "player_duration", json!({})).await?;
        Ok(reply.duration.filter(|d| *d > 0))
    }

    /// Capture the screen and return the stored file path.
    pub async fn capture_screen(&self, serial: &str) -> Result<String, ClientError> {
        let reply: ScreenshotResponse = self.command(serial, "screenshot", json!({})).await?;
        Ok(reply.path)
    }
}
