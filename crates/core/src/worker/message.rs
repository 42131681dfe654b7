//! The `message` signal: page-to-worker notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ServiceWorker;

/// Payloads pages post to the worker.
///
/// Nothing is acted on; the worker only records them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum WorkerMessage {
    /// Connectivity change observed by the page.
    ConnectionStatus {
        #[serde(rename = "isOnline")]
        is_online: bool,
        description: String,
    },
    /// Outcome of the install prompt.
    InstallOutcome {
        #[serde(rename = "appInstalled")]
        app_installed: bool,
    },
    Other(Value),
}

impl WorkerMessage {
    pub fn parse(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(WorkerMessage::Other(value))
    }
}

impl ServiceWorker {
    /// Handle the `message` signal.
    pub fn handle_message(&self, payload: Value) -> WorkerMessage {
        let message = WorkerMessage::parse(payload);
        match &message {
            WorkerMessage::ConnectionStatus { is_online, description } => {
                tracing::info!(is_online, description = %description, "Message from page: connection status");
            }
            WorkerMessage::InstallOutcome { app_installed } => {
                tracing::info!(app_installed, "Message from page: install outcome");
            }
            WorkerMessage::Other(value) => {
                tracing::info!(payload = %value, "Message from page");
            }
        }
        message
    }
}
