//! Fire-and-forget publication of lifecycle events
//!
//! Publishers report failures; `LifecycleNotifier` bounds each attempt with a
//! timeout and absorbs every failure so callers never see one.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::LifecycleEvent;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("failed to encode event: {0}")]
    Encode(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("subscriber rejected event with status {0}")]
    Rejected(u16),
}

/// A channel that lifecycle events can be handed to
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError>;
}

/// POSTs each envelope as JSON to a subscriber URL
pub struct WebhookPublisher {
    url: String,
    client: reqwest::Client,
}

impl WebhookPublisher {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Writes envelopes to the log; used when no subscriber is configured
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let body = serde_json::to_string(event).map_err(|e| NotifyError::Encode(e.to_string()))?;
        info!("📣 Lifecycle event: {}", body);
        Ok(())
    }
}

/// Keeps every published envelope in memory
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<LifecycleEvent>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every attempt fails without recording anything
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("broker unreachable".to_string()));
        }
        self.events
            .lock()
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Best-effort notifier handed to the account service
#[derive(Clone)]
pub struct LifecycleNotifier {
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
}

impl LifecycleNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>, timeout: Duration) -> Self {
        Self { publisher, timeout }
    }

    /// Attempt one publication. The outcome is logged and otherwise ignored.
    pub async fn notify(&self, event: LifecycleEvent) {
        match tokio::time::timeout(self.timeout, self.publisher.publish(&event)).await {
            Ok(Ok(())) => debug!("Published {} event", event.kind()),
            Ok(Err(e)) => warn!("Dropped {} event: {}", event.kind(), e),
            Err(_) => warn!(
                "Dropped {} event: publish timed out after {:?}",
                event.kind(),
                self.timeout
            ),
        }
    }
}
