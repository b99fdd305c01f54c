//! Boundary to the external speed-measurement tool.
//!
//! The heavy lifting (best-server selection, download and upload runs,
//! share-link generation) happens inside the configured CLI, invoked as a
//! subprocess that prints a single JSON document on stdout. This module
//! only launches it, parses the result, and classifies failures.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::SpeedtestConfig;

/// Diagnostic the CLI prints when it cannot reach the measurement backend.
const CONFIG_RETRIEVAL_MARKER: &str = "Cannot retrieve speedtest configuration";

#[derive(Debug, Error)]
pub enum SpeedtestError {
    /// The measurement backend was unreachable (config retrieval failed).
    #[error("cannot retrieve measurement configuration")]
    ConfigRetrieval,
    /// Anything else: spawn failure, non-zero exit, unparseable output.
    #[error("{0}")]
    Failed(String),
}

/// One finished measurement, as reported by the CLI.
///
/// `upload` and `download` are bits per second; `ping` and `server.latency`
/// are milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeedtestResult {
    pub download: f64,
    pub upload: f64,
    pub ping: f64,
    pub timestamp: DateTime<Utc>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub server: ServerInfo,
    pub client: ClientInfo,
    pub share: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub country: String,
    pub cc: String,
    pub sponsor: String,
    pub latency: f64,
    pub lat: String,
    pub lon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub ip: String,
    pub lat: String,
    pub lon: String,
    pub country: String,
    pub isp: String,
    pub isprating: String,
}

/// Runs the configured measurement command and parses its output.
pub struct SpeedtestRunner {
    command: String,
    args: Vec<String>,
}

impl SpeedtestRunner {
    pub fn new(config: &SpeedtestConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Run one measurement to completion. No timeout, no retries.
    pub async fn run(&self) -> Result<SpeedtestResult, SpeedtestError> {
        debug!("Running measurement command: {} {:?}", self.command, self.args);

        let output = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| SpeedtestError::Failed(format!("failed to launch {}: {e}", self.command)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| SpeedtestError::Failed(format!("unreadable measurement output: {e}")))
    }
}

fn classify_failure(stderr: &str) -> SpeedtestError {
    if stderr.contains(CONFIG_RETRIEVAL_MARKER) {
        return SpeedtestError::ConfigRetrieval;
    }
    let detail = stderr.trim();
    SpeedtestError::Failed(if detail.is_empty() {
        "measurement command exited with an error".to_string()
    } else {
        detail.to_string()
    })
}
