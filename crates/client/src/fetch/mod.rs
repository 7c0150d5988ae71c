//! Network access for the worker.
//!
//! ### Network seam
//! - [`Network`] is the only way the interceptor and the population routine
//!   reach the network, so tests swap in an in-memory double.
//! - A `FetchError` always means "no usable response"; HTTP error statuses
//!   are successful fetches.
//!
//! ### Response classification
//! - Final URL same origin as the app root: `basic`
//! - Cross-origin, `cors` mode, `Access-Control-Allow-Origin` present: `cors`
//! - Any other cross-origin response: `opaque`
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use offcache_core::{AppConfig, RequestDescriptor, RequestMode, ResponseSnapshot, ResponseType};
use reqwest::{Client, Method, Url};

pub use self::url::{UrlError, resolve};

/// Errors from a network fetch. Each one means no response was obtained.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timeout after {0}ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// The host could not be reached at all.
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: usize },
}

impl From<FetchError> for offcache_core::Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(msg) => offcache_core::Error::InvalidUrl(msg),
            other => offcache_core::Error::Transport(other.to_string()),
        }
    }
}

impl From<UrlError> for FetchError {
    fn from(err: UrlError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

/// Something that turns a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Issue the request. Any response, including 4xx/5xx, is `Ok`.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin whose responses are classified `basic`.
    pub origin: Url,

    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Defaults for the given app origin.
    pub fn for_origin(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }

    /// Build from application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, offcache_core::Error> {
        let origin = config
            .app_root_url()
            .map_err(|e| offcache_core::Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::for_origin(origin)
        })
    }
}

/// Classify a response by where it came from and how it was requested.
pub fn classify(origin: &Url, final_url: &Url, mode: RequestMode, allows_origin: bool) -> ResponseType {
    if final_url.origin() == origin.origin() {
        ResponseType::Basic
    } else if mode == RequestMode::Cors && allows_origin {
        ResponseType::Cors
    } else {
        ResponseType::Opaque
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_send_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout.as_millis() as u64)
        } else if err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError> {
        let start = Instant::now();

        match request.url.scheme() {
            "http" | "https" => {}
            scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string()).into()),
        }

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("bad method {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge { size: len, limit: self.config.max_bytes });
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        if body.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge { size: body.len() as u64, limit: self.config.max_bytes });
        }

        let allows_origin = headers.iter().any(|(k, _)| k == "access-control-allow-origin");
        let response_type = classify(&self.config.origin, &final_url, request.mode, allows_origin);

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes, {})",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len(),
            response_type.as_str()
        );

        Ok(ResponseSnapshot {
            url: Some(final_url.to_string()),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
            response_type,
        })
    }
}
