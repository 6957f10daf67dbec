//! Actuator boundary.
//!
//! The control plane never touches pixels itself: every gesture is handed to
//! an [`Actuator`], implemented in production by the device automation host.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use watchfleet_client::{AutomationHostClient, ClientError, ElementHandle, Key, Selector};
use watchfleet_core::Device;
use watchfleet_pattern::{DoubleTap, Swipe, Tap};

/// Actuator errors.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("automation host error: {0}")]
    Client(#[from] ClientError),

    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// Primitive UI operations on one device.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn tap(&self, tap: &Tap) -> Result<(), ActuatorError>;

    async fn double_tap(&self, tap: &DoubleTap) -> Result<(), ActuatorError>;

    async fn swipe(&self, swipe: &Swipe) -> Result<(), ActuatorError>;

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), ActuatorError>;

    async fn press_key(&self, key: Key) -> Result<(), ActuatorError>;

    /// First element matching any of `selectors`, waiting up to `timeout_ms`.
    async fn find_element(
        &self,
        selectors: &[Selector],
        timeout_ms: u64,
    ) -> Result<Option<ElementHandle>, ActuatorError>;

    /// Search result entries on the current page, top to bottom.
    async fn visible_results(&self) -> Result<Vec<ElementHandle>, ActuatorError>;

    async fn back(&self) -> Result<(), ActuatorError>;

    async fn home(&self) -> Result<(), ActuatorError>;

    async fn launch_app(&self, package: &str) -> Result<(), ActuatorError>;

    async fn open_url(&self, url: &str) -> Result<(), ActuatorError>;

    /// Duration shown by the player, `None` when it cannot be read.
    async fn read_player_duration(&self) -> Result<Option<u32>, ActuatorError>;

    /// Capture the screen and return the stored path.
    async fn capture_screen(&self) -> Result<String, ActuatorError>;
}

/// Hands out an actuator for a device.
pub trait ActuatorProvider: Send + Sync {
    fn actuator(&self, device: &Device) -> Arc<dyn Actuator>;
}

/// Actuator backed by the automation host HTTP API.
pub struct HostActuator {
    client: AutomationHostClient,
    serial: String,
}

impl HostActuator {
    pub fn new(client: AutomationHostClient, serial: impl Into<String>) -> Self {
        Self {
            client,
            serial: serial.into(),
        }
    }
}

#[async_trait]
impl Actuator for HostActuator {
    async fn tap(&self, tap: &Tap) -> Result<(), ActuatorError> {
        Ok(self.client.tap(&self.serial, tap).await?)
    }

    async fn double_tap(&self, tap: &DoubleTap) -> Result<(), ActuatorError> {
        Ok(self.client.double_tap(&self.serial, tap).await?)
    }

    async fn swipe(&self, swipe: &Swipe) -> Result<(), ActuatorError> {
        Ok(self.client.swipe(&self.serial, swipe).await?)
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), ActuatorError> {
        Ok(self.client.type_text(&self.serial, element, text).await?)
    }

    async fn press_key(&self, key: Key) -> Result<(), ActuatorError> {
        Ok(self.client.press_key(&self.serial, key).await?)
    }

    async fn find_element(
        &self,
        selectors: &[Selector],
        timeout_ms: u64,
    ) -> Result<Option<ElementHandle>, ActuatorError> {
        Ok(self
            .client
            .find_element(&self.serial, selectors, timeout_ms)
            .await?)
    }

    async fn visible_results(&self) -> Result<Vec<ElementHandle>, ActuatorError> {
        Ok(self.client.visible_results(&self.serial).await?)
    }

    async fn back(&self) -> Result<(), ActuatorError> {
        Ok(self.client.back(&self.serial).await?)
    }

    async fn home(&self) -> Result<(), ActuatorError> {
        Ok(self.client.home(&self.serial).await?)
    }

    async fn launch_app(&self, package: &str) -> Result<(), ActuatorError> {
        Ok(self.client.launch_app(&self.serial, package).await?)
    }

    async fn open_url(&self, url: &str) -> Result<(), ActuatorError> {
        Ok(self.client.open_url(&self.serial, url).await?)
    }

    async fn read_player_duration(&self) -> Result<Option<u32>, ActuatorError> {
        Ok(self.client.read_player_duration(&self.serial).await?)
    }

    async fn capture_screen(&self) -> Result<String, ActuatorError> {
        Ok(self.client.capture_screen(&self.serial).await?)
    }
}

/// Provides [`HostActuator`]s addressed by device serial.
pub struct HostActuatorProvider {
    client: AutomationHostClient,
}

impl HostActuatorProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: AutomationHostClient::new(base_url),
        }
    }
}

impl ActuatorProvider for HostActuatorProvider {
    fn actuator(&self, device: &Device) -> Arc<dyn Actuator> {
        Arc::new(HostActuator::new(self.client.clone(), device.serial.clone()))
    }
}
