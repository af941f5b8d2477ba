use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodgate::config::{FloodgateConfig, StoreConfig};
use floodgate::http::{Gate, HttpServer};
use floodgate::store::{CounterStore, MemoryStore, RedisStore};

#[derive(Parser, Debug)]
#[command(version, about = "Per-client request rate limiting middleware")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured listen address
    #[arg(long)]
    listen_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Floodgate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &args.config {
        Some(path) => FloodgateConfig::from_file(path)?,
        None => FloodgateConfig::default(),
    };
    if let Some(addr) = args.listen_addr {
        config.server.listen_addr = addr;
    }
    config.validate()?;
    info!(
        listen_addr = %config.server.listen_addr,
        limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    // Initialize the counter store
    let store: Arc<dyn CounterStore> = match &config.store {
        StoreConfig::Memory { max_entries } => {
            info!(max_entries = max_entries, "Using in-memory counter store");
            Arc::new(MemoryStore::new(*max_entries))
        }
        StoreConfig::Redis { url } => Arc::new(RedisStore::connect(url).await?),
    };

    let gate = Arc::new(Gate::new(&config, store));
    let server = HttpServer::new(config.server.listen_addr, gate);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Floodgate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
