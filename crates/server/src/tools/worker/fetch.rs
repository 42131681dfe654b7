//! worker_fetch tool implementation.
//!
//! Issues a request as a page would: through the active worker, which answers
//! from its partitions, the network, or the offline document.

use std::sync::Arc;

use cinecache_client::canonicalize;
use cinecache_core::{Error, FetchEvent, PreloadResponse, Request, RequestMode, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::state::HostState;
use crate::tools::json_result;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default GET). Only GET is intercepted.
    #[serde(default)]
    pub method: Option<String>,

    /// Request mode (default cors). Use "navigate" for a page load.
    #[serde(default)]
    pub mode: Option<RequestMode>,
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
    pub source: ResponseSource,
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(state: &HostState, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let origin = state.config.origin_url().map_err(Error::from)?;
    let url = canonicalize(&origin, &params.url).map_err(|e| HostError::InvalidInput(e.to_string()))?;

    let method = params.method.as_deref().unwrap_or("GET").trim().to_ascii_uppercase();
    if method.is_empty() {
        return Err(HostError::InvalidInput("method cannot be empty".into()).into());
    }

    let mut request = Request::get(url).with_method(method);
    if let Some(mode) = params.mode {
        request.mode = mode;
    }

    let mut event = FetchEvent::new(request.clone());
    if request.is_navigation()
        && request.is_get()
        && state.config.navigation_preload
        && state.registration.active().await.is_some()
    {
        event = event.with_preload(start_preload(state, request.clone()));
    }

    let served = state.registration.fetch(event).await?;

    json_result(&WorkerFetchOutput {
        url: request.url.to_string(),
        status: served.response.status,
        content_type: served.response.content_type().map(String::from),
        body: served.response.text(),
        body_bytes: served.response.body.len(),
        source: served.source,
    })
}

/// Start the navigation fetch in parallel with interception, as a browser does.
fn start_preload(state: &HostState, request: Request) -> PreloadResponse {
    let (sender, preload) = PreloadResponse::channel();
    let network = Arc::clone(&state.network);
    tokio::spawn(async move {
        sender.send(network.fetch(&request).await);
    });
    preload
}
