//! offcache server entry point.
//!
//! Boots the worker and serves its lifecycle and request events as MCP tools
//! on stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::{FetchClient, FetchConfig, GenerationManager, WorkerSettings};
use offcache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache = %config.cache_name, db = %config.db_path.display(), "Starting offcache on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let settings = WorkerSettings::from_config(&config)?;
    let worker = Arc::new(GenerationManager::new(db, Arc::new(network), settings));

    let handler = handler::OffcacheServer::new(worker.clone(), config.notification_title.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    worker.flush().await;

    Ok(())
}
