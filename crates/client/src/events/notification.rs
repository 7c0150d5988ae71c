//! Notification click routing.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::push::EXPLORE_ACTION;

/// Document opened by the `explore` action, relative to the app root.
pub const ENTRY_DOCUMENT: &str = "./index.html";

/// What the host does after a click. The notification is always closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClickDirective {
    pub close: bool,
    pub open_window: Option<String>,
}

/// `explore` opens the entry document; any other action, or a click on the
/// notification body, only closes it.
pub fn route_click(action: Option<&str>, entry_document: &Url) -> ClickDirective {
    let open_window = match action {
        Some(EXPLORE_ACTION) => Some(entry_document.to_string()),
        _ => None,
    };
    tracing::debug!(action = action.unwrap_or(""), opens = open_window.is_some(), "notification click");
    ClickDirective { close: true, open_window }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Url {
        Url::parse("https://app.test/index.html").unwrap()
    }

    #[test]
    fn test_explore_opens_entry_document() {
        let directive = route_click(Some("explore"), &index());
        assert!(directive.close);
        assert_eq!(directive.open_window.as_deref(), Some("https://app.test/index.html"));
    }

    #[test]
    fn test_other_actions_only_close() {
        for action in [Some("close"), Some("reply"), None] {
            let directive = route_click(action, &index());
            assert!(directive.close);
            assert!(directive.open_window.is_none());
        }
    }
}
