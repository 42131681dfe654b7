//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::HostState;
use crate::tools::cache::{CacheKeysParams, keys_impl};
use crate::tools::movies::{MovieRecommendationsParams, MovieSearchParams, recommendations_impl, search_impl};
use crate::tools::records::{RecordsListParams, list_impl};
use crate::tools::worker::{
    WorkerFetchParams, WorkerMessageParams, activate_impl, fetch_impl, install_impl, message_impl, status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for cinecache.
#[derive(Clone)]
pub struct CinecacheServer {
    state: Arc<HostState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CinecacheServer {
    /// Create a new server handler over shared host state.
    pub fn new(state: Arc<HostState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Deliver the install signal: fetch the static asset manifest into a new static partition. The new worker activates immediately unless another is active and it did not ask to skip waiting."
    )]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.state).await
    }

    #[tool(description = "Activate the waiting worker, deleting partitions that belong to other generations.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.state).await
    }

    #[tool(description = "Show the active and waiting workers and every cache partition with its entry count.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    /// Issue a request as a page would.
    ///
    /// GET requests are answered cache-first by the active worker; navigations
    /// and HTML requests fall back to the offline page when the network fails.
    #[tool(
        description = "Fetch a URL through the offline worker. Returns status, body and where the response came from (cache, preload, network, fallback, passthrough)."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Post a message to the active worker, e.g. {\"isOnline\": false, \"description\": \"...\"}.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(description = "List the entries of a cache partition in insertion order (oldest first).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.state.db(), params.0).await
    }

    #[tool(
        description = "Search the TMDB movie catalog by keyword through the worker. Results are kept in movieStore and served from there when offline."
    )]
    async fn movie_search(&self, params: Parameters<MovieSearchParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Fetch TMDB recommendations for a movie id through the worker. Results are kept in suggestStore and served from there when offline."
    )]
    async fn movie_recommendations(
        &self, params: Parameters<MovieRecommendationsParams>,
    ) -> Result<CallToolResult, McpError> {
        recommendations_impl(&self.state, params.0).await
    }

    #[tool(description = "List every record in a collection (movieStore or suggestStore), ordered by key.")]
    async fn records_list(&self, params: Parameters<RecordsListParams>) -> Result<CallToolResult, McpError> {
        list_impl(self.state.db(), params.0).await
    }
}

impl ServerHandler for CinecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "cinecache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
