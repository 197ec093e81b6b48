//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker and to the cache inspection tools.
use std::sync::Arc;

use motionmap_client::Worker;
use motionmap_core::CacheDb;

use crate::tools::cache::{CacheGetParams, CacheKeysParams, get_impl, keys_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_lifecycle::{activate_impl, install_impl};
use crate::tools::sw_message::{SwMessageParams, message_impl};
use crate::tools::sw_status::status_impl;

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

/// The MCP server hosting one worker generation.
#[derive(Clone)]
pub struct WorkerServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
    db: CacheDb,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl WorkerServer {
    pub fn new(worker: Arc<Worker>, db: CacheDb) -> Self {
        Self { tool_router: Self::tool_router(), worker, db }
    }

    /// Route one request through the worker.
    #[tool(
        description = "Handle a request as the offline cache worker would. Images and audio are cache-first, documents network-first with cache fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Run the install phase: pre-warm the shell store with the app shell assets.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Run the activate phase: delete stores from older cache generations and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Deliver a control message such as SKIP_WAITING or CLEAR_CACHE.
    #[tool(
        description = "Post a control message to the worker. Supported: {\"type\":\"SKIP_WAITING\"}, {\"type\":\"CLEAR_CACHE\"}. Others are ignored."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report worker state, current store names and entry counts of every store.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker, &self.db).await
    }

    #[tool(description = "Look up the cached entry for a URL, in one store or across all stores.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, &self.db, params.0).await
    }

    #[tool(description = "List the entries of one store in insertion order.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.db, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "motionmap-sw".into(),
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
