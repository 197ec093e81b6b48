//! Out-of-band control messages from the host page.

use serde::{Deserialize, Serialize};

use motionmap_core::Error;

use super::{Worker, WorkerState};

/// A recognized control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate now instead of waiting for old clients to close.
    SkipWaiting,
    /// Delete every store, current or not.
    ClearCache,
}

impl ControlMessage {
    /// Parse a message payload. Anything that is not a recognized
    /// `{ "type": ... }` object yields `None`.
    pub fn parse(payload: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}

/// Confirmation that a control message was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlAck {
    SkipWaiting {
        /// Whether this message triggered activation.
        activated: bool,
    },
    ClearCache {
        deleted: Vec<String>,
    },
}

impl Worker {
    /// Deliver a raw message payload. Unrecognized messages are ignored.
    pub async fn handle_message(&self, payload: &serde_json::Value) -> Result<Option<ControlAck>, Error> {
        match ControlMessage::parse(payload) {
            Some(message) => self.apply_message(message).await.map(Some),
            None => {
                tracing::debug!(%payload, "ignoring unrecognized control message");
                Ok(None)
            }
        }
    }

    /// Carry out a control message and report what happened.
    pub async fn apply_message(&self, message: ControlMessage) -> Result<ControlAck, Error> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, std::sync::atomic::Ordering::SeqCst);
                let activated = if self.state().await == WorkerState::Installed {
                    self.activate().await?;
                    true
                } else {
                    false
                };
                Ok(ControlAck::SkipWaiting { activated })
            }
            ControlMessage::ClearCache => {
                self.settle().await;
                let mut deleted = Vec::new();
                for name in self.storage.keys().await? {
                    match self.storage.delete(&name).await {
                        Ok(true) => deleted.push(name),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(store = %name, error = %e, "failed to clear store"),
                    }
                }
                tracing::info!(deleted = deleted.len(), "cleared all stores");
                Ok(ControlAck::ClearCache { deleted })
            }
        }
    }
}
