//! `reefd` — the Reef node daemon.
//!
//! Binary entrypoint that ties the Reef components together into a running
//! node: local chunk storage, the chunk-transfer HTTP API, and the
//! global-encoding orchestrator.
//!
//! # Usage
//!
//! ```text
//! reefd start                          # start with defaults
//! reefd start -c reef.toml             # start with a config file
//! reefd start -d ./node2 -l 127.0.0.1:4831   # second instance
//! reefd start --memory                 # no disk persistence
//! ```

mod config;
mod handler;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reef_encode::{GlobalEncoder, GroupView, StatusBoard};
use reef_net::{HttpMetaClient, HttpPeerClient};
use reef_store::{FileGateway, MemoryGateway, StoreGateway};
use tracing::info;

use config::CliConfig;
use handler::AppState;

#[derive(Parser)]
#[command(name = "reefd", version, about = "Reef distributed object storage daemon")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Reef node.
    Start {
        /// Override data directory (useful for running multiple instances).
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Override listen address (e.g. "127.0.0.1:4831").
        #[arg(short = 'l', long)]
        listen_addr: Option<String>,

        /// Run fully in-memory (no disk persistence).
        #[arg(short, long)]
        memory: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Start {
            data_dir,
            listen_addr,
            memory,
        } => {
            // CLI args override config file values.
            if let Some(dir) = data_dir {
                config.node.data_dir = dir;
            }
            if let Some(addr) = listen_addr {
                config.node.listen_addr = addr;
            }
            if memory {
                config.node.backend = "memory".to_string();
            }
            cmd_start(config).await
        }
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn cmd_start(config: CliConfig) -> Result<()> {
    info!("starting reefd");
    let encode_config = config.encode_config();
    info!(
        region = %config.node.region,
        listen_addr = %config.node.listen_addr,
        backend = %config.node.backend,
        local_shards = encode_config.local_shards,
        chunk_size = encode_config.chunk_size,
        groups = config.groups.len(),
        "node configuration"
    );

    let gateway: Arc<dyn StoreGateway> = match config.node.backend.as_str() {
        "memory" => {
            info!("using in-memory chunk store");
            Arc::new(MemoryGateway::new())
        }
        _ => {
            info!(path = %config.node.data_dir.display(), "using file chunk store");
            Arc::new(
                FileGateway::new(&config.node.data_dir)
                    .context("failed to initialize file store")?,
            )
        }
    };

    let timeout = Duration::from_secs(config.meta.timeout_secs);
    let peers = Arc::new(HttpPeerClient::new(timeout).context("failed to build peer client")?);
    let meta = Arc::new(
        HttpMetaClient::new(&config.meta.endpoint, timeout)
            .context("failed to build metadata client")?,
    );
    let groups: Arc<dyn GroupView> = Arc::new(config.group_view());

    let encoder = Arc::new(GlobalEncoder::new(
        gateway.clone(),
        peers,
        meta,
        groups.clone(),
        encode_config,
    ));

    let state = AppState {
        gateway,
        encoder,
        board: Arc::new(StatusBoard::new()),
        groups,
    };

    let listener = tokio::net::TcpListener::bind(&config.node.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.node.listen_addr))?;
    info!(addr = %config.node.listen_addr, "chunk API ready");
    axum::serve(listener, handler::router(state))
        .await
        .context("server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_start_flags() {
        let cli = Cli::try_parse_from(["reefd", "start", "-l", "127.0.0.1:9999", "--memory"])
            .expect("CLI should parse");
        match cli.command {
            Commands::Start {
                listen_addr,
                memory,
                ..
            } => {
                assert_eq!(listen_addr.as_deref(), Some("127.0.0.1:9999"));
                assert!(memory);
            }
        }
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::try_parse_from(["reefd", "start", "-c", "reef.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("reef.toml")));
    }
}
