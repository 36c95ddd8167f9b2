//! MCP Server Entry Point
//!
//! Initializes logging, loads configuration from the environment and starts
//! the configured transport. See `core::config` for the variables read.
//!
//! Logging always goes to stderr so stdout stays clean for JSON-RPC. The
//! filter comes from `RUST_LOG` and defaults to `info`.

mod core;
mod tools;

use std::sync::Arc;

use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::core::config::{ServerConfig, TransportMode};
use crate::core::error::ServerError;
use crate::core::server::{self, McpServer};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::from_env()?;
    let server = Arc::new(McpServer::new(config.info.clone(), tools::initialize_tools()));

    match config.transport {
        TransportMode::Stdio => server::run_server_stdio(server).await?,
        TransportMode::Http => server::run_server_http(server, &config.http).await?,
        TransportMode::Both => {
            // STDIO in the background so MCP Inspector can attach while
            // HTTP serves in the foreground
            let stdio_server = server.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(stdio_server).await {
                    error!("STDIO server error: {}", e);
                }
            });

            let http_result = server::run_server_http(server, &config.http).await;

            // If HTTP server exits, stop STDIO as well
            stdio_handle.abort();
            http_result?
        }
    }

    Ok(())
}
