use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Duration;
use satchel_s3_credentials::{Minter, Presentation, ReadCredential};
use tokio::sync::RwLock;

use super::{ObjectKey, ObjectStore, ObjectStoreError};

/// An object held by a [MemoryObjectStore]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// The object's bytes
    pub bytes: Vec<u8>,
    /// The content type given at upload
    pub content_type: String,
}

/// An [ObjectStore] that keeps blobs in memory. Read credentials are still
/// signed by a real [Minter], so URLs look exactly like those of a bucket at
/// the minter's address.
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<ObjectKey, StoredObject>>>,
    minter: Minter,
}

impl MemoryObjectStore {
    /// An empty store that signs with `minter`
    pub fn new(minter: Minter) -> Self {
        Self {
            objects: Arc::default(),
            minter,
        }
    }

    /// Fetch a stored object
    pub async fn get(&self, key: &ObjectKey) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds nothing
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.objects.write().await.insert(
            key.clone(),
            StoredObject {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), ObjectStoreError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn mint_read_credential(
        &self,
        key: &ObjectKey,
        lifetime: Duration,
        presentation: &Presentation,
    ) -> Result<ReadCredential, ObjectStoreError> {
        Ok(self.minter.mint(key.as_str(), lifetime, presentation)?)
    }

    fn ceiling(&self) -> Duration {
        self.minter.ceiling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use satchel_common::ManualClock;
    use satchel_s3_credentials::{Address, Credentials};

    fn store() -> Result<MemoryObjectStore> {
        let credentials = Credentials::new(
            Address::new("http://localhost:9000", "us-east-1", "satchel"),
            "local",
            "local-secret",
        )?;
        let minter = Minter::new(credentials, Arc::new(ManualClock::default()))
            .with_ceiling(Duration::hours(12));
        Ok(MemoryObjectStore::new(minter))
    }

    #[tokio::test]
    async fn it_stores_and_deletes_objects() -> Result<()> {
        let store = store()?;
        let key = ObjectKey::new("files/u/f");

        store.put(&key, b"hello".to_vec(), "text/plain").await?;
        assert_eq!(
            store.get(&key).await,
            Some(StoredObject {
                bytes: b"hello".to_vec(),
                content_type: "text/plain".into()
            })
        );

        store.delete(&key).await?;
        store.delete(&key).await?;
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn it_mints_within_its_ceiling() -> Result<()> {
        let store = store()?;

        let credential = store.mint_read_credential(
            &ObjectKey::new("files/u/f"),
            Duration::days(2),
            &Presentation::default(),
        )?;

        assert_eq!(store.ceiling(), Duration::hours(12));
        assert_eq!(credential.lifetime, 12 * 3600);
        assert_eq!(credential.url.path(), "/satchel/files/u/f");
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_minting_failures() -> Result<()> {
        let store = store()?;

        let result = store.mint_read_credential(
            &ObjectKey::new("k"),
            Duration::zero(),
            &Presentation::default(),
        );

        assert!(matches!(result, Err(ObjectStoreError::Minting(_))));
        Ok(())
    }
}
