//! sw_install tool implementation.
//!
//! Opens the current generation and populates it from the precache manifest.

use offcache_client::{GenerationManager, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub state: WorkerState,
    pub cache_name: String,
    /// Number of manifest entries stored.
    pub cached: usize,
    pub skip_waiting: bool,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &GenerationManager) -> Result<CallToolResult, McpError> {
    let outcome = worker.install().await?;
    let output = SwInstallOutput {
        state: worker.state().await,
        cache_name: outcome.cache_name,
        cached: outcome.cached,
        skip_waiting: outcome.skip_waiting,
    };
    json_result(&output)
}
