//! sw_activate tool implementation.
//!
//! Deletes stale generations and claims open clients.

use offcache_client::{GenerationManager, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    pub state: WorkerState,
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// Stale generations that could not be removed; activation still succeeds.
    pub failed: Vec<String>,
    pub clients_claimed: bool,
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &GenerationManager) -> Result<CallToolResult, McpError> {
    let outcome = worker.activate().await?;
    let output = SwActivateOutput {
        state: worker.state().await,
        deleted: outcome.deleted,
        failed: outcome.failed,
        clients_claimed: outcome.clients_claimed,
    };
    json_result(&output)
}
