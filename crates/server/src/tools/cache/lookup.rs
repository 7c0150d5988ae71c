//! cache_match tool implementation.
//!
//! Looks a request up in the current generation without touching the network.

use std::collections::BTreeMap;

use offcache_client::{GenerationManager, fetch::resolve};
use offcache_core::{Error, RequestDescriptor};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;
use crate::tools::sw_fetch::HeaderEntry;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path relative to the app root.
    pub url: String,

    /// Request headers, compared against the stored entry's `Vary` header.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub generation: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: String,
    pub headers: Vec<HeaderEntry>,
    pub body_bytes: usize,
    /// Final URL after redirects, when known.
    pub response_url: Option<String>,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(worker: &GenerationManager, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.settings().app_root, &params.url)
        .map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;
    let request = params
        .headers
        .iter()
        .fold(RequestDescriptor::get(url), |req, (name, value)| req.with_header(name, value));
    let identity = request.identity_url();

    let db = worker.db();
    if !db.has_generation(worker.cache_name()).await? {
        return Err(Error::CacheMiss(identity).into());
    }
    let generation = db.open_generation(worker.cache_name()).await?;
    let snapshot = generation
        .match_request(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(identity.clone()))?;

    let output = CacheMatchOutput {
        generation: generation.name().to_string(),
        url: identity,
        status: snapshot.status,
        status_text: snapshot.status_text,
        response_type: snapshot.response_type.as_str().to_string(),
        headers: snapshot
            .headers
            .into_iter()
            .map(|(name, value)| HeaderEntry { name, value })
            .collect(),
        body_bytes: snapshot.body.len(),
        response_url: snapshot.url,
    };
    json_result(&output)
}
