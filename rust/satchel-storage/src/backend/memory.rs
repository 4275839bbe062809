use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DocumentBackend;
use crate::SatchelStorageError;

/// A [DocumentBackend] backed by a [HashMap]. Values are kept in memory and
/// never persisted; clones share the same map.
///
/// Editions are drawn from a counter that only grows, so an edition is never
/// reused even after its key is deleted and recreated.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, (Vec<u8>, u64)>>>,
    revision: Arc<AtomicU64>,
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    type Edition = u64;

    async fn resolve(&self, key: &str) -> Result<Option<(Vec<u8>, u64)>, SatchelStorageError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn replace(
        &self,
        key: &str,
        edition: Option<&u64>,
        content: Option<Vec<u8>>,
    ) -> Result<Option<u64>, SatchelStorageError> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|(_, edition)| edition);

        if current != edition {
            return Err(SatchelStorageError::Conflict(key.to_owned()));
        }

        match content {
            Some(bytes) => {
                let next = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
                entries.insert(key.to_owned(), (bytes, next));
                Ok(Some(next))
            }
            None => {
                entries.remove(key);
                Ok(None)
            }
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, SatchelStorageError> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
