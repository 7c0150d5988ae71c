//! sw_notification_click tool implementation.

use offcache_client::events::{ClickDirective, ENTRY_DOCUMENT, route_click};
use offcache_client::fetch::resolve;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// The action button clicked; absent for a click on the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(
    app_root: &Url, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let entry = resolve(app_root, ENTRY_DOCUMENT).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let directive: ClickDirective = route_click(params.action.as_deref(), &entry);
    json_result(&directive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{INDEX, ROOT, parse};

    fn root() -> Url {
        Url::parse(ROOT).unwrap()
    }

    #[tokio::test]
    async fn test_notification_click_explore() {
        let params = SwNotificationClickParams { action: Some("explore".into()) };
        let output: ClickDirective = parse(&notification_click_impl(&root(), params).await.unwrap());
        assert!(output.close);
        assert_eq!(output.open_window.as_deref(), Some(INDEX));
    }

    #[tokio::test]
    async fn test_notification_click_close() {
        let params = SwNotificationClickParams { action: Some("close".into()) };
        let output: ClickDirective = parse(&notification_click_impl(&root(), params).await.unwrap());
        assert!(output.close);
        assert!(output.open_window.is_none());
    }
}
