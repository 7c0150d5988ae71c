//! MCP server handler implementation.
//!
//! Each host event (install, activate, fetch, push, notification click, sync)
//! is one tool; two more tools inspect the cache.
use std::sync::Arc;

use offcache_client::GenerationManager;
use offcache_client::events::{LoggingSyncHandler, SyncHandler};

use crate::tools::cache::{CacheMatchParams, generations_impl, match_impl};
use crate::tools::sw_activate::activate_impl;
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_install::install_impl;
use crate::tools::sw_notification_click::{SwNotificationClickParams, notification_click_impl};
use crate::tools::sw_push::{SwPushParams, push_impl};
use crate::tools::sw_sync::{SwSyncParams, sync_impl};

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

/// The offcache MCP server handler.
#[derive(Clone)]
pub struct OffcacheServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<GenerationManager>,
    sync_handler: Arc<dyn SyncHandler>,
    notification_title: String,
}

#[tool_router]
impl OffcacheServer {
    /// Create a handler around a worker, with the default sync handler.
    pub fn new(worker: Arc<GenerationManager>, notification_title: String) -> Self {
        Self::with_sync_handler(worker, notification_title, Arc::new(LoggingSyncHandler))
    }

    pub fn with_sync_handler(
        worker: Arc<GenerationManager>, notification_title: String, sync_handler: Arc<dyn SyncHandler>,
    ) -> Self {
        Self { tool_router: Self::tool_router(), worker, sync_handler, notification_title }
    }

    #[tool(
        description = "Install the worker: open the current cache generation and populate it from the precache manifest. Fails as a whole if any entry cannot be fetched."
    )]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(
        description = "Activate an installed worker: delete every cache generation other than the current one and start answering requests from the cache."
    )]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Answer a page request.
    ///
    /// Cache first, then network; navigations fall back to the cached offline
    /// page and other requests get a synthetic 503 when both miss.
    #[tool(
        description = "Answer a page request the way the worker would. Returns the response source (cache, network_cached, network, offline_fallback, unavailable), status, headers and base64 body."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Turn a push message into the notification to display.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.notification_title, params.0).await
    }

    #[tool(
        description = "Route a notification click. The notification is always closed; the explore action also opens the entry document."
    )]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker.settings().app_root, params.0).await
    }

    #[tool(description = "Run deferred work for a background sync tag. Only the background-sync tag is handled.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(self.sync_handler.as_ref(), params.0).await
    }

    #[tool(description = "List stored cache generations with entry counts, marking the current one.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.worker).await
    }

    #[tool(description = "Look a URL up in the current cache generation without touching the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
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
