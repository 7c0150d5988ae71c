//! Worker lifecycle and generation cutover.
//!
//! `Uninitialized -> Installing -> Installed -> Activating -> Active`
//!
//! Install opens the current generation and populates it from the manifest.
//! Activate deletes every other generation and starts routing requests
//! through the [`RequestInterceptor`]. Until then the worker is uncontrolled
//! and requests go straight to the network.

use std::sync::Arc;

use futures_util::future::join_all;
use offcache_core::{AppConfig, CacheDb, Error, RequestDescriptor, ResponseSnapshot};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::fetch::{Network, resolve};
use crate::interceptor::{Intercepted, RequestInterceptor, ResponseSource};
use crate::precache::{self, Precache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninitialized,
    Installing,
    Installed,
    Activating,
    Active,
}

/// Result of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutcome {
    pub cache_name: String,
    /// Number of manifest entries stored.
    pub cached: usize,
    /// Take over loading pages without waiting for a reload.
    pub skip_waiting: bool,
}

/// Result of an activation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutcome {
    pub cache_name: String,
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// Stale generations that could not be removed.
    pub failed: Vec<String>,
    /// Take control of every open client immediately.
    pub clients_claimed: bool,
}

/// Settings the manager is built from.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub cache_name: String,
    pub app_root: Url,
    pub manifest: Precache,
    pub offline_page: Url,
}

impl WorkerSettings {
    /// Resolve manifest and offline page against the configured app root.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let app_root = config.app_root_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = Precache::resolve(&app_root, &config.precache)?;
        let offline_page = resolve(&app_root, &config.offline_page)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.offline_page)))?;
        Ok(Self { cache_name: config.cache_name.clone(), app_root, manifest, offline_page })
    }
}

/// Owns the current generation name and the worker state machine.
pub struct GenerationManager {
    db: CacheDb,
    network: Arc<dyn Network>,
    settings: WorkerSettings,
    state: RwLock<WorkerState>,
    interceptor: RwLock<Option<Arc<RequestInterceptor>>>,
    transition: Mutex<()>,
}

impl GenerationManager {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, settings: WorkerSettings) -> Self {
        Self {
            db,
            network,
            settings,
            state: RwLock::new(WorkerState::Uninitialized),
            interceptor: RwLock::new(None),
            transition: Mutex::new(()),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.settings.cache_name
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        tracing::info!(cache = %self.settings.cache_name, from = ?*state, to = ?next, "worker state change");
        *state = next;
    }

    /// Open the current generation and populate it from the manifest.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the worker is already active.
    /// - [`Error::StorageUnavailable`] or [`Error::PopulationFailed`] if the
    ///   generation cannot be opened or filled. The worker falls back to
    ///   `Uninitialized` and stays uncontrolled.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let _transition = self.transition.lock().await;

        if self.state().await == WorkerState::Active {
            return Err(Error::InvalidState(format!(
                "{} is already active; change the cache name to install a new generation",
                self.settings.cache_name
            )));
        }

        self.set_state(WorkerState::Installing).await;

        let result = async {
            let generation = self.db.open_generation(&self.settings.cache_name).await?;
            precache::populate(&generation, self.network.as_ref(), &self.settings.manifest).await
        }
        .await;

        match result {
            Ok(cached) => {
                self.set_state(WorkerState::Installed).await;
                Ok(InstallOutcome { cache_name: self.settings.cache_name.clone(), cached, skip_waiting: true })
            }
            Err(e) => {
                tracing::error!(cache = %self.settings.cache_name, error = %e, "install failed");
                self.set_state(WorkerState::Uninitialized).await;
                Err(e)
            }
        }
    }

    /// Delete stale generations and take control of requests.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless a successful install came first.
    /// - [`Error::StorageUnavailable`] if generations cannot be listed or the
    ///   current one cannot be opened; the worker stays installed.
    ///
    /// Failures deleting individual stale generations are logged and reported
    /// in [`ActivateOutcome::failed`] without failing activation.
    pub async fn activate(&self) -> Result<ActivateOutcome, Error> {
        let _transition = self.transition.lock().await;

        let state = self.state().await;
        if state != WorkerState::Installed {
            return Err(Error::InvalidState(format!("cannot activate from {state:?}")));
        }

        self.set_state(WorkerState::Activating).await;

        match self.cutover().await {
            Ok(outcome) => {
                self.set_state(WorkerState::Active).await;
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(cache = %self.settings.cache_name, error = %e, "activation failed");
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    async fn cutover(&self) -> Result<ActivateOutcome, Error> {
        let current = &self.settings.cache_name;
        let names = self
            .db
            .list_generation_names()
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

        let stale: Vec<String> = names.into_iter().filter(|name| name != current).collect();
        let results = join_all(stale.iter().map(|name| self.db.delete_generation(name))).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::info!(generation = %name, "deleted stale generation");
                    deleted.push(name);
                }
                Ok(false) => tracing::debug!(generation = %name, "stale generation already gone"),
                Err(e) => {
                    let err = Error::EvictionFailed { name: name.clone(), reason: e.to_string() };
                    tracing::warn!(error = %err, "stale generation not deleted");
                    failed.push(name);
                }
            }
        }

        let generation = self
            .db
            .open_generation(current)
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        let interceptor =
            RequestInterceptor::new(generation, self.network.clone(), self.settings.offline_page.clone());
        *self.interceptor.write().await = Some(Arc::new(interceptor));

        Ok(ActivateOutcome { cache_name: current.clone(), deleted, failed, clients_claimed: true })
    }

    /// The active interceptor, if the worker controls requests.
    pub async fn interceptor(&self) -> Option<Arc<RequestInterceptor>> {
        self.interceptor.read().await.clone()
    }

    /// Whether requests are routed through the cache.
    pub async fn is_controlling(&self) -> bool {
        self.interceptor.read().await.is_some()
    }

    /// Answer a request: through the interceptor once active, straight from
    /// the network before that.
    pub async fn handle_fetch(&self, request: &RequestDescriptor) -> Intercepted {
        if let Some(interceptor) = self.interceptor().await {
            return interceptor.handle(request).await;
        }

        match self.network.fetch(request).await {
            Ok(response) => Intercepted::new(ResponseSource::Network, response),
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "uncontrolled fetch failed");
                Intercepted::new(ResponseSource::Unavailable, ResponseSnapshot::service_unavailable())
            }
        }
    }

    /// Wait for queued cache writes.
    pub async fn flush(&self) {
        if let Some(interceptor) = self.interceptor().await {
            interceptor.flush().await;
        }
    }
}
