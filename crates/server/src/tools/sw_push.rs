//! sw_push tool implementation.

use chrono::Utc;
use offcache_client::events::{NotificationDirective, build_notification};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push message text, used as the notification body.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(title: &str, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let directive: NotificationDirective = build_notification(title, params.payload.as_deref(), Utc::now());
    json_result(&directive)
}
