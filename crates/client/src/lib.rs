//! Worker side of offcache.
//!
//! This crate provides the network client, install-time population, the
//! request interceptor, and the worker lifecycle built on top of
//! `offcache-core` storage.

pub mod events;
pub mod fetch;
pub mod interceptor;
pub mod lifecycle;
pub mod precache;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchError, Network};
pub use interceptor::{Intercepted, RequestInterceptor, ResponseSource};
pub use lifecycle::{ActivateOutcome, GenerationManager, InstallOutcome, WorkerSettings, WorkerState};
pub use precache::{Precache, populate};
