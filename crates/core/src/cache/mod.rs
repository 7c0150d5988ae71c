//! SQLite-backed response cache organized into named generations.
//!
//! This module provides a persistent cache using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Generation-scoped lookups and writes through [`GenerationHandle`]
//! - Request identity hashing using SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-generation eviction

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredKey;
pub use generations::{GenerationHandle, GenerationSummary};
