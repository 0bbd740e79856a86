use anyhow::{ensure, Result};
use serde::Deserialize;
use std::time::Duration;

/// Environment variables override file settings, e.g.
/// `TRANSCRIPT_BUS__BROKER__URL=nats://broker:4222`.
const ENV_PREFIX: &str = "TRANSCRIPT_BUS";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub broker: BrokerConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BrokerConfig {
    /// NATS server URL
    pub url: String,
    /// How long a tag-channel request waits for the worker's reply
    pub rpc_timeout_ms: u64,
}

impl BrokerConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Redis server URL
    pub url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        ensure!(
            cfg.broker.rpc_timeout_ms > 0,
            "broker.rpc_timeout_ms must be greater than zero"
        );

        Ok(cfg)
    }
}
