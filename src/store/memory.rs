use super::KeyValueStore;
use crate::error::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process set store that also records each `add_members` request.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sets: Arc<Mutex<HashMap<String, BTreeSet<String>>>>,
    requests: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current members of the set at `key`
    pub async fn members(&self, key: &str) -> BTreeSet<String> {
        self.sets
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Every `(key, values)` pair passed to `add_members`, in call order
    pub async fn requests(&self) -> Vec<(String, Vec<String>)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn add_members(&self, key: &str, values: &[String]) -> Result<()> {
        self.requests
            .lock()
            .await
            .push((key.to_string(), values.to_vec()));

        self.sets
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .extend(values.iter().cloned());

        Ok(())
    }
}
