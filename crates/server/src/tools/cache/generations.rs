//! cache_generations tool implementation.
//!
//! Lists stored generations with their entry counts.

use offcache_client::GenerationManager;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
    /// Whether this is the generation the worker installs into.
    pub current: bool,
}

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(worker: &GenerationManager) -> Result<CallToolResult, McpError> {
    let generations = worker
        .db()
        .generation_summaries()
        .await?
        .into_iter()
        .map(|summary| GenerationInfo {
            current: summary.name == worker.cache_name(),
            name: summary.name,
            created_at: summary.created_at,
            entries: summary.entries,
        })
        .collect();

    json_result(&CacheGenerationsOutput { generations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{online, parse, worker};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_generations_impl_empty() {
        let worker = worker(Arc::new(online()), "v1").await;
        let output: CacheGenerationsOutput = parse(&generations_impl(&worker).await.unwrap());
        assert!(output.generations.is_empty());
    }

    #[tokio::test]
    async fn test_generations_impl_marks_current() {
        let worker = worker(Arc::new(online()), "v2").await;
        worker.db().open_generation("v1").await.unwrap();
        worker.install().await.unwrap();

        let output: CacheGenerationsOutput = parse(&generations_impl(&worker).await.unwrap());
        let rows: Vec<(&str, u64, bool)> = output
            .generations
            .iter()
            .map(|g| (g.name.as_str(), g.entries, g.current))
            .collect();
        assert_eq!(rows, vec![("v1", 0, false), ("v2", 3, true)]);
    }
}
