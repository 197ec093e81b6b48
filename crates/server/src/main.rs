//! motionmap-sw entry point.
//!
//! Boots one worker generation over the configured SQLite store, runs install
//! (and activate, when install asks to skip waiting), then serves worker
//! events as MCP tools on stdio. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use motionmap_client::{FetchClient, FetchConfig, Worker, WorkerConfig};
use motionmap_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

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
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        version = config.cache_version,
        "starting motionmap-sw on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app_config(&config)?)?;
    let worker = Arc::new(Worker::new(
        WorkerConfig::from_app_config(&config)?,
        Arc::new(db.clone()),
        Arc::new(network),
    ));

    match worker.install().await {
        Ok(()) if worker.skip_waiting_requested() => {
            worker.activate().await?;
        }
        Ok(()) => {}
        Err(e) => tracing::warn!(error = %e, "install failed, serving without a pre-warmed shell"),
    }

    let handler = handler::WorkerServer::new(worker.clone(), db);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    worker.settle().await;
    Ok(())
}
