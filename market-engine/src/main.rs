//! Market engine process: a single bus adapter tying Redis pub/sub to the
//! `orderbook` matching engine.
//!
//! Configuration is environment-only (`REDIS_URL`), there is no CLI to
//! parse — the process starts, subscribes, runs until `SIGINT`/`SIGTERM`,
//! and exits.

mod bus;
mod error;
mod messages;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use bus::BusAdapter;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
    info!(redis_url, "starting market engine");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install signal handler");
            return;
        }
        info!("shutdown signal received, draining");
        let _ = shutdown_tx.send(true);
    });

    let mut adapter = BusAdapter::new(redis_url);
    adapter
        .run(shutdown_rx)
        .await
        .context("market engine bus adapter exited with an error")?;

    info!("market engine stopped");
    Ok(())
}
