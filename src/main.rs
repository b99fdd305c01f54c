mod bot;
mod config;
mod health;
mod report;
mod speedtest;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,speedbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Health endpoint: {}", config.health.bind_addr);
    info!("  Measurement command: {}", config.speedtest.command);

    // Liveness endpoint for the external process monitor. Runs on its own
    // task; losing it must not take the bot down.
    let health_addr: SocketAddr = config
        .health
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid health bind address: {}", config.health.bind_addr))?;
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_addr).await {
            error!("Liveness endpoint failed: {:#}", e);
        }
    });

    // Run the Telegram bot
    info!("Bot is starting...");
    bot::run(config).await?;

    Ok(())
}
