//! sw_fetch tool implementation.
//!
//! Answers a page request the way the worker would: cache first, network on
//! miss, offline fallback for navigations. Before activation requests pass
//! straight through to the network.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use offcache_client::{GenerationManager, ResponseSource, fetch::resolve};
use offcache_core::{Destination, RequestDescriptor, RequestMode};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the app root.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request destination: "document", "image", "script", "style", "font",
    /// "manifest", or empty.
    #[serde(default)]
    pub destination: String,

    /// Request mode. Defaults to "navigate" for documents and "no-cors"
    /// otherwise.
    #[serde(default)]
    pub mode: Option<RequestMode>,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub source: ResponseSource,
    /// Whether the worker was routing requests through the cache.
    pub controlled: bool,
    pub status: u16,
    pub status_text: String,
    /// "basic", "cors", "opaque" or "error".
    pub response_type: String,
    pub headers: Vec<HeaderEntry>,
    pub body_base64: String,
    /// Final URL after redirects, when known.
    pub url: Option<String>,
}

impl SwFetchParams {
    fn into_request(self, worker: &GenerationManager) -> Result<RequestDescriptor, ToolError> {
        let url = resolve(&worker.settings().app_root, &self.url)
            .map_err(|e| ToolError::InvalidInput(format!("{}: {e}", self.url)))?;
        if self.method.trim().is_empty() {
            return Err(ToolError::InvalidInput("method must not be empty".into()));
        }

        let destination = Destination::parse(&self.destination);
        let mode = self.mode.unwrap_or(if destination == Destination::Document {
            RequestMode::Navigate
        } else {
            RequestMode::NoCors
        });

        let request = self
            .headers
            .iter()
            .fold(RequestDescriptor::get(url), |req, (name, value)| req.with_header(name, value))
            .with_method(&self.method)
            .with_destination(destination)
            .with_mode(mode);
        Ok(request)
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &GenerationManager, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = params.into_request(worker)?;
    let controlled = worker.is_controlling().await;
    let served = worker.handle_fetch(&request).await;

    tracing::debug!(
        url = %request.url,
        source = ?served.source,
        status = served.response.status,
        "fetch event answered"
    );

    let response = served.response;
    let output = SwFetchOutput {
        source: served.source,
        controlled,
        status: response.status,
        status_text: response.status_text,
        response_type: response.response_type.as_str().to_string(),
        headers: response
            .headers
            .into_iter()
            .map(|(name, value)| HeaderEntry { name, value })
            .collect(),
        body_base64: STANDARD.encode(&response.body),
        url: response.url,
    };
    json_result(&output)
}
