use super::KeyValueStore;
use crate::error::{Result, TranscriptError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

/// [`KeyValueStore`] backed by Redis sets (`SADD`).
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", url);

        let client = redis::Client::open(url).map_err(|e| TranscriptError::store(url, e))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| TranscriptError::store(url, e))?;

        info!("Connected to Redis successfully");

        Ok(Self { connection })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn add_members(&self, key: &str, values: &[String]) -> Result<()> {
        // ConnectionManager clones share one multiplexed connection
        let mut connection = self.connection.clone();

        let added: i64 = connection
            .sadd(key, values)
            .await
            .map_err(|e| TranscriptError::store(key, e))?;

        debug!("SADD {} ({} requested, {} new)", key, values.len(), added);

        Ok(())
    }
}
