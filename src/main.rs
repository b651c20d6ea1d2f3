use gro_indexer::{config, db::SqliteStore, indexer};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Gro indexer starting...");

    // Load configuration
    let cfg = config::load()?;
    info!("  RPC URL: {}", cfg.rpc_http_url);
    info!("  DB Path: {}", cfg.db_path);
    info!("  Confirmations: {}", cfg.confirmations);
    info!("  Contracts watched: {:?}", cfg.watched_addresses());

    // Open the store; the schema is created on first use
    let store = SqliteStore::open(&cfg.db_path)?;

    tokio::select! {
        res = indexer::run(cfg, store) => match res {
            Ok(()) => info!("Indexer exited cleanly"),
            Err(e) => error!("Indexer error: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Gro indexer stopped.");
    Ok(())
}
