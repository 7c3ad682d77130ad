//! Tool server backend library.
//!
//! Exposes shell and file tools to a remote agent over MCP on stdio. It
//! handles:
//! - Configuration from the environment (and an optional `.env` file)
//! - Logging to stderr, keeping stdout for protocol traffic
//! - The request loop and tool dispatch
//!
//! # Architecture
//!
//! - `config`: process configuration resolved at startup
//! - `mcp`: JSON-RPC types and the stdio server loop
//! - `tools`: tool registry, argument validation, and implementations
//! - `core`: shared types

pub mod config;
pub mod core;
pub mod mcp;
pub mod tools;

use config::Config;
use mcp::{McpServer, TransportError};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] std::io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ---------------------------------------------------------------------------
// Application entry point
// ---------------------------------------------------------------------------

/// Install the global tracing subscriber. `RUST_LOG` wins when set.
pub fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Load configuration, start logging, and serve stdio until input closes.
pub async fn run() -> Result<(), AppError> {
    let config = Config::from_env().map_err(AppError::Config)?;
    init_tracing(&config);

    tracing::info!(
        name = %config.server_name,
        version = %config.server_version,
        workspace = %config.workspace_path.display(),
        platform = %config.platform,
        "starting tool server"
    );

    let server = McpServer::from_config(&config);
    server.run_stdio().await?;
    Ok(())
}
