//! cinecache host entry point.
//!
//! Boots the offline worker over the configured database and serves it as an
//! MCP server on stdio transport. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use cinecache_client::{FetchClient, FetchConfig};
use cinecache_core::{AppConfig, CacheDb, MOVIE_STORE, Network, SUGGEST_STORE};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(db_path = %config.db_path.display(), origin = %config.origin, "Starting cinecache on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let created = db.ensure_collections(&[MOVIE_STORE, SUGGEST_STORE]).await?;
    if !created.is_empty() {
        tracing::info!(?created, "created record collections");
    }

    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let state = Arc::new(state::HostState::new(config, db, network));

    match state.config.generation() {
        Ok(generation) => {
            if let Err(e) = state.registration.register(generation).await {
                tracing::warn!("initial install failed; requests pass through until worker_install succeeds: {}", e);
            }
        }
        Err(e) => tracing::warn!("invalid generation configuration: {}", e),
    }

    let handler = handler::CinecacheServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
