//! MCP tool implementations.
//!
//! One module per host event, plus read-only cache inspection.

pub mod cache;
pub mod sw_activate;
pub mod sw_fetch;
pub mod sw_install;
pub mod sw_notification_click;
pub mod sw_push;
pub mod sw_sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Encode a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::EncodeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
