//! Background sync dispatch.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Work deferred until connectivity returns.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn run(&self) -> Result<(), String>;
}

/// Default handler: records that a sync happened.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSyncHandler;

#[async_trait]
impl SyncHandler for LoggingSyncHandler {
    async fn run(&self) -> Result<(), String> {
        tracing::info!("background sync ran");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutcome {
    pub tag: String,
    /// Whether the tag was recognized and the handler succeeded.
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run `handler` for [`BACKGROUND_SYNC_TAG`]; other tags are ignored.
pub async fn dispatch(tag: &str, handler: &dyn SyncHandler) -> SyncOutcome {
    if tag != BACKGROUND_SYNC_TAG {
        tracing::debug!(tag, "ignoring unknown sync tag");
        return SyncOutcome { tag: tag.to_string(), handled: false, error: None };
    }

    match handler.run().await {
        Ok(()) => SyncOutcome { tag: tag.to_string(), handled: true, error: None },
        Err(e) => {
            tracing::warn!(tag, error = %e, "background sync handler failed");
            SyncOutcome { tag: tag.to_string(), handled: false, error: Some(e) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SyncHandler for Counting {
        async fn run(&self) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail { Err("outbox locked".into()) } else { Ok(()) }
        }
    }

    #[tokio::test]
    async fn test_background_sync_invokes_handler() {
        let handler = Counting::default();
        let outcome = dispatch("background-sync", &handler).await;
        assert!(outcome.handled);
        assert_eq!(handler.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_tags_ignored() {
        let handler = Counting::default();
        let outcome = dispatch("periodic-refresh", &handler).await;
        assert!(!outcome.handled);
        assert_eq!(outcome.tag, "periodic-refresh");
        assert_eq!(handler.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_failure_reported() {
        let handler = Counting { fail: true, ..Default::default() };
        let outcome = dispatch(BACKGROUND_SYNC_TAG, &handler).await;
        assert!(!outcome.handled);
        assert_eq!(outcome.error.as_deref(), Some("outbox locked"));
    }

    #[tokio::test]
    async fn test_logging_handler_succeeds() {
        assert!(dispatch(BACKGROUND_SYNC_TAG, &LoggingSyncHandler).await.handled);
    }
}
