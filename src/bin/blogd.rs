//! Blog server binary

use blogd::common::{Config, StorageBackend};
use blogd::BlogServer;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blogd")]
#[command(about = "gRPC blog service backed by an embedded document store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    Serve {
        /// Config file (TOML); defaults to $BLOGD_CONFIG or ./blogd.toml if present
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address for gRPC
        #[arg(long)]
        grpc: Option<SocketAddr>,

        /// Bind address for the admin HTTP API
        #[arg(long)]
        http: Option<SocketAddr>,

        /// Storage backend (memory, sled)
        #[arg(long)]
        storage: Option<StorageBackend>,

        /// Data directory for the sled backend
        #[arg(long)]
        data: Option<PathBuf>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long)]
        log_level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            grpc,
            http,
            storage,
            data,
            log_level,
        } => {
            // Load config from file, then override with CLI arguments
            let mut config = match config {
                Some(path) => Config::from_file(path)?,
                None => Config::load()?,
            };
            if let Some(addr) = grpc {
                config.server.grpc_addr = addr;
            }
            if http.is_some() {
                config.server.http_addr = http;
            }
            if let Some(backend) = storage {
                config.storage.backend = backend;
            }
            if let Some(path) = data {
                config.storage.path = path;
            }
            if let Some(level) = log_level {
                config.log_level = level;
            }
            config.validate()?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            tracing::info!("blogd {} starting", blogd::VERSION);
            BlogServer::new(config).serve().await?;
        }
    }

    Ok(())
}
