//! Liveness endpoint for an external process monitor.
//!
//! Single route, static body. Not part of the bot's logic — a supervisor
//! polls it to confirm the process is up.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tracing::info;

async fn live() -> &'static str {
    "Speedtest Bot is Running!"
}

pub fn router() -> Router {
    Router::new().route("/", get(live))
}

pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind liveness endpoint on {addr}"))?;
    info!("Liveness endpoint listening on {}", addr);
    axum::serve(listener, router())
        .await
        .context("Liveness endpoint server error")?;
    Ok(())
}
