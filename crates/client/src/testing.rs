//! In-memory [`Network`] double.
//!
//! Routes are keyed by identity URL (fragment stripped). Unrouted URLs and
//! any request made while offline fail with [`FetchError::Unreachable`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use offcache_core::{RequestDescriptor, ResponseSnapshot};

use crate::fetch::{FetchError, Network};

#[derive(Default)]
pub struct StaticNetwork {
    routes: Mutex<HashMap<String, Result<ResponseSnapshot, String>>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl StaticNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn with_response(self, url: &str, response: ResponseSnapshot) -> Self {
        self.set_response(url, response);
        self
    }

    /// Fail `url` with a transport error.
    pub fn with_failure(self, url: &str, reason: &str) -> Self {
        self.set_failure(url, reason);
        self
    }

    pub fn set_response(&self, url: &str, response: ResponseSnapshot) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Ok(response));
    }

    pub fn set_failure(&self, url: &str, reason: &str) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Err(reason.to_string()));
    }

    /// Make every request fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap_or_else(PoisonError::into_inner) = offline;
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, FetchError> {
        let url = request.identity_url();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());

        if *self.offline.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(FetchError::Unreachable(format!("offline: {url}")));
        }

        match self.routes.lock().unwrap_or_else(PoisonError::into_inner).get(&url) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(reason)) => Err(FetchError::Unreachable(reason.clone())),
            None => Err(FetchError::Unreachable(format!("no route for {url}"))),
        }
    }
}
