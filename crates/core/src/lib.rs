//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Generation-scoped response cache with SQLite backend
//! - Request and response snapshot types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, GenerationHandle, StoredKey};
pub use config::AppConfig;
pub use error::Error;
pub use request::{Destination, RequestDescriptor, RequestMode};
pub use response::{ResponseSnapshot, ResponseType};
