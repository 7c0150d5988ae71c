//! Response snapshots.
//!
//! A [`ResponseSnapshot`] is a fully buffered response: status, headers and
//! body bytes. Bodies are [`Bytes`], so cloning a snapshot yields an
//! independent readable copy without copying the payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Classification of a response relative to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response the server opted in to sharing.
    Cors,
    /// Cross-origin response that cannot be inspected.
    Opaque,
    /// Synthetic failure response.
    Error,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

/// An immutable, fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// Final URL after redirects, if known.
    pub url: Option<String>,
    pub status: u16,
    pub status_text: String,
    /// Header pairs in arrival order, names lower-case.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl ResponseSnapshot {
    /// A `basic` response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: None,
            status,
            status_text: default_status_text(status).to_string(),
            headers: Vec::new(),
            body: body.into(),
            response_type: ResponseType::Basic,
        }
    }

    /// The synthetic response returned when neither cache nor network can
    /// answer a request.
    pub fn service_unavailable() -> Self {
        Self {
            response_type: ResponseType::Error,
            headers: vec![("content-type".to_string(), "text/plain; charset=utf-8".to_string())],
            ..Self::new(503, Bytes::from_static(b"Service Unavailable"))
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Status in the 200-299 range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header names listed in `Vary`, lower-cased. `*` is returned as-is.
    pub fn vary(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("vary"))
            .flat_map(|(_, v)| v.split(','))
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect()
    }
}

fn default_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_round_trip() {
        for t in [ResponseType::Basic, ResponseType::Cors, ResponseType::Opaque, ResponseType::Error] {
            assert_eq!(ResponseType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ResponseType::parse("opaqueredirect"), None);
    }

    #[test]
    fn test_service_unavailable() {
        let resp = ResponseSnapshot::service_unavailable();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.status_text, "Service Unavailable");
        assert_eq!(resp.response_type, ResponseType::Error);
        assert!(!resp.is_ok());
    }

    #[test]
    fn test_header_lookup() {
        let resp = ResponseSnapshot::new(200, "x").with_header("Content-Type", "text/html");
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(resp.header("etag"), None);
    }

    #[test]
    fn test_vary_parsing() {
        let resp = ResponseSnapshot::new(200, "x")
            .with_header("Vary", "Accept-Encoding, Accept-Language")
            .with_header("vary", "Origin");
        assert_eq!(resp.vary(), vec!["accept-encoding", "accept-language", "origin"]);
    }

    #[test]
    fn test_clone_shares_body() {
        let original = ResponseSnapshot::new(200, Bytes::from_static(b"<html></html>"));
        let copy = original.clone();
        assert_eq!(copy.body, original.body);
        assert_eq!(copy, original);
    }
}
