//! Push message to notification directive.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Body used when the push message carries no text.
pub const DEFAULT_BODY: &str = "You have a new message";

pub const ICON: &str = "./icon-192x192.png";
pub const BADGE: &str = "./icon-96x96.png";
pub const VIBRATE: [u32; 3] = [100, 50, 100];

pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch when the push arrived.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// What the host should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationDirective {
    pub title: String,
    pub options: NotificationOptions,
}

/// Build the notification for a push message.
///
/// Blank or missing payload text falls back to [`DEFAULT_BODY`].
pub fn build_notification(title: &str, payload: Option<&str>, now: DateTime<Utc>) -> NotificationDirective {
    let body = payload
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(DEFAULT_BODY)
        .to_string();

    tracing::debug!(title, has_payload = payload.is_some(), "building push notification");

    NotificationDirective {
        title: title.to_string(),
        options: NotificationOptions {
            body,
            icon: ICON.to_string(),
            badge: BADGE.to_string(),
            vibrate: VIBRATE.to_vec(),
            data: NotificationData { date_of_arrival: now.timestamp_millis(), primary_key: 1 },
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.to_string(),
                    title: "View message".to_string(),
                    icon: Some(BADGE.to_string()),
                },
                NotificationAction {
                    action: CLOSE_ACTION.to_string(),
                    title: "Close".to_string(),
                    icon: Some(BADGE.to_string()),
                },
            ],
        },
    }
}
