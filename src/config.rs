use anyhow::Result;
use config::{Config as ConfigSource, Environment, File};
use serde::Deserialize;

use crate::utils::error::ConfigError;

pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io/api";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub port: u16,
    pub eth_node_url: String,
    pub etherscan_api_key: String,
    pub explorer_url: String,
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Layers: `.env` file, optional `config.{toml,yaml,json}`, then the
    /// process environment (`PORT`, `ETH_NODE_URL`, `ETHERSCAN_API_KEY`,
    /// `EXPLORER_URL`, `METRICS_PORT`).
    pub fn load() -> Result<Self> {
        if dotenv::dotenv().is_err() {
            tracing::info!(
                event = "dotenv_missing",
                message = "No .env file found, using environment variables"
            );
        }

        let source = ConfigSource::builder()
            .set_default("port", 8080)?
            .set_default("etherscan_api_key", "")?
            .set_default("explorer_url", DEFAULT_EXPLORER_URL)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let config: Config = source.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.eth_node_url.trim().is_empty() {
            return Err(ConfigError::Missing("ETH_NODE_URL"));
        }
        if self.explorer_url.trim().is_empty() {
            return Err(ConfigError::Missing("EXPLORER_URL"));
        }
        Ok(())
    }
}
