//! Outgoing request descriptors.
//!
//! A [`RequestDescriptor`] is everything the interceptor and the store need to
//! know about a request: method, URL, headers, and where the response is
//! going to be used.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// What the response to a request will be used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// A full-page navigation.
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// Anything else (fetch/XHR).
    #[default]
    #[serde(rename = "")]
    Empty,
}

impl Destination {
    /// Parse a destination name; unknown names map to [`Destination::Empty`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => Destination::Empty,
        }
    }
}

/// Request mode, used to classify cross-origin responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// A request as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: Url,
    /// Header names are stored lower-case.
    pub headers: BTreeMap<String, String>,
    pub destination: Destination,
    pub mode: RequestMode,
}

impl RequestDescriptor {
    /// A plain `GET` for the given URL.
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: BTreeMap::new(),
            destination: Destination::Empty,
            mode: RequestMode::NoCors,
        }
    }

    /// A top-level navigation to the given URL.
    pub fn navigate(url: Url) -> Self {
        Self { destination: Destination::Document, mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.trim().to_ascii_uppercase();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.trim().to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The URL used for cache identity: fragment stripped.
    pub fn identity_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Whether the request targets a full-page navigation.
    pub fn is_document(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Whether the request URL shares scheme, host and port with `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }
}
