//! intern-scout server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use scout_core::{JobStore, ScoutConfig};
use scout_engine::Analyzer;
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

    let config = ScoutConfig::load().context("failed to load configuration")?;
    let store = JobStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open job store at {}", config.db_path.display()))?;
    let analyzer = Analyzer::from_config(config).context("failed to build analyzer")?;

    tracing::info!(
        model = %analyzer.config().model_name,
        discovery = analyzer.discovery().is_some(),
        "Starting intern-scout server on stdio transport"
    );

    let handler = handler::ScoutServer::new(analyzer, store);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
