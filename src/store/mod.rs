//! Key-value store capability used for the shared keyword set

pub mod memory;
pub mod redis;

use crate::error::Result;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Add `values` to the set stored at `key`. Deduplication is the store's job.
    async fn add_members(&self, key: &str, values: &[String]) -> Result<()>;
}
