//! worker_message tool implementation.

use cinecache_core::WorkerMessage;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::HostState;
use crate::tools::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Any JSON payload, e.g. `{"isOnline": false, "description": "..."}`.
    pub payload: Value,
}

/// Output from the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageOutput {
    /// The payload as the worker understood it.
    pub message: WorkerMessage,
    /// False when no worker was active to receive it.
    pub delivered: bool,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(state: &HostState, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let delivered = state.registration.active().await.is_some();
    let message = state.registration.message(params.payload).await;

    json_result(&WorkerMessageOutput { message, delivered })
}
