use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::store::{next_version, ThreadStore};
use crate::workflow::Checkpoint;

/// In-memory storage for tests and local development
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStore for MemoryStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.entries.read().await.get(thread_id).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint, expected: Option<u64>) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let actual = entries.get(&checkpoint.thread_id).map(|c| c.version);
        if actual != expected {
            return Err(Error::VersionConflict {
                thread_id: checkpoint.thread_id.clone(),
                expected,
                actual,
            });
        }

        let version = next_version(expected);
        let mut stored = checkpoint.clone();
        stored.version = version;
        entries.insert(stored.thread_id.clone(), stored);
        Ok(version)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
