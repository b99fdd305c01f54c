use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable that overrides `[telegram] bot_token`.
pub const TOKEN_ENV: &str = "SPEEDBOT_BOT_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub speedtest: SpeedtestConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeedtestConfig {
    #[serde(default = "default_speedtest_command")]
    pub command: String,
    #[serde(default = "default_speedtest_args")]
    pub args: Vec<String>,
}

impl Default for SpeedtestConfig {
    fn default() -> Self {
        Self {
            command: default_speedtest_command(),
            args: default_speedtest_args(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_speedtest_command() -> String {
    "speedtest-cli".to_string()
}

fn default_speedtest_args() -> Vec<String> {
    vec![
        "--json".to_string(),
        "--share".to_string(),
        "--secure".to_string(),
    ]
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist. The bot token may come from the file or
    /// from `SPEEDBOT_BOT_TOKEN` (the environment wins); a missing token
    /// fails startup.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_token_override(std::env::var(TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_token_override(&mut self, env_token: Option<String>) {
        if let Some(token) = env_token {
            if !token.is_empty() {
                self.telegram.bot_token = token;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "No bot token configured: set [telegram] bot_token in config.toml \
                 or the {TOKEN_ENV} environment variable"
            );
        }
        self.health
            .bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid [health] bind_addr: {}", self.health.bind_addr))?;
        if self.speedtest.command.trim().is_empty() {
            anyhow::bail!("[speedtest] command must not be empty");
        }
        Ok(())
    }
}
