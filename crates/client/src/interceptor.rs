//! Cache-first request interception.
//!
//! Every request resolves to exactly one response:
//!
//! 1. A snapshot in the current generation is returned verbatim. No
//!    revalidation; entries live until their generation is evicted.
//! 2. Otherwise the request goes to the network. A `200` `basic` response to
//!    a `GET` is cloned and stored by a detached task while the original is
//!    returned; anything else is returned uncached.
//! 3. With no network response, navigations get the cached offline page and
//!    everything else gets a synthetic `503`.

use std::sync::{Arc, Mutex, PoisonError};

use offcache_core::{GenerationHandle, RequestDescriptor, ResponseSnapshot, ResponseType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::Network;

/// Which branch produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Served from the current generation.
    Cache,
    /// Fetched and queued for storage.
    NetworkCached,
    /// Fetched, not cacheable.
    Network,
    /// Network unreachable; cached offline page served to a navigation.
    OfflineFallback,
    /// Network unreachable and nothing cached to serve.
    Unavailable,
}

/// The single response produced for a request.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub source: ResponseSource,
    pub response: ResponseSnapshot,
}

impl Intercepted {
    pub(crate) fn new(source: ResponseSource, response: ResponseSnapshot) -> Self {
        Self { source, response }
    }
}

/// A response is stored only if it is a `200` same-origin answer to a `GET`.
pub fn is_cacheable(request: &RequestDescriptor, response: &ResponseSnapshot) -> bool {
    request.is_get() && response.status == 200 && response.response_type == ResponseType::Basic
}

/// Per-request decision procedure bound to one generation.
pub struct RequestInterceptor {
    generation: GenerationHandle,
    network: Arc<dyn Network>,
    offline_page: Url,
    pending: Mutex<JoinSet<()>>,
}

impl RequestInterceptor {
    pub fn new(generation: GenerationHandle, network: Arc<dyn Network>, offline_page: Url) -> Self {
        Self { generation, network, offline_page, pending: Mutex::new(JoinSet::new()) }
    }

    pub fn generation(&self) -> &GenerationHandle {
        &self.generation
    }

    /// Produce the response for `request`.
    pub async fn handle(&self, request: &RequestDescriptor) -> Intercepted {
        match self.generation.match_request(request).await {
            Ok(Some(response)) => {
                tracing::debug!("cache hit for {}", request.url);
                return Intercepted::new(ResponseSource::Cache, response);
            }
            Ok(None) => tracing::debug!("cache miss for {}", request.url),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss"),
        }

        match self.network.fetch(request).await {
            Ok(response) if is_cacheable(request, &response) => {
                self.store_in_background(request.clone(), response.clone());
                Intercepted::new(ResponseSource::NetworkCached, response)
            }
            Ok(response) => {
                tracing::debug!(
                    url = %request.url,
                    status = response.status,
                    response_type = response.response_type.as_str(),
                    "response not cacheable"
                );
                Intercepted::new(ResponseSource::Network, response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network fetch failed");
                self.recover(request).await
            }
        }
    }

    async fn recover(&self, request: &RequestDescriptor) -> Intercepted {
        if request.is_document() {
            let fallback = RequestDescriptor::get(self.offline_page.clone());
            match self.generation.match_request(&fallback).await {
                Ok(Some(page)) => return Intercepted::new(ResponseSource::OfflineFallback, page),
                Ok(None) => tracing::warn!(page = %self.offline_page, "offline page is not cached"),
                Err(e) => tracing::warn!(page = %self.offline_page, error = %e, "offline page lookup failed"),
            }
        }

        Intercepted::new(ResponseSource::Unavailable, ResponseSnapshot::service_unavailable())
    }

    fn store_in_background(&self, request: RequestDescriptor, response: ResponseSnapshot) {
        let generation = self.generation.clone();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        while pending.try_join_next().is_some() {}

        pending.spawn(async move {
            match generation.put(&request, &response).await {
                Ok(true) => tracing::debug!("cached {}", request.url),
                Ok(false) => tracing::debug!(
                    generation = generation.name(),
                    "generation removed before {} could be cached",
                    request.url
                ),
                Err(e) => tracing::warn!(url = %request.url, error = %e, "background cache write failed"),
            }
        });
    }

    /// Wait for every queued cache write to finish.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background cache write panicked");
            }
        }
    }
}
