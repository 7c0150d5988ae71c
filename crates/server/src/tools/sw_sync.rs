//! sw_sync tool implementation.

use offcache_client::events::{SyncHandler, SyncOutcome, dispatch};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync registration tag; only "background-sync" is handled.
    pub tag: String,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(handler: &dyn SyncHandler, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(ToolError::InvalidInput("tag must not be empty".into()).into());
    }
    let outcome: SyncOutcome = dispatch(&params.tag, handler).await;
    json_result(&outcome)
}
