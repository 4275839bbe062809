//! Persistence for capabilities.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use satchel_storage::{Collection, DocumentBackend, Encoder, JsonEncoder, SatchelStorageError};

use crate::{Capability, CapabilityId, Entity, FileId, ShareError, UserId};

/// The capability store adapter.
///
/// Implementations keep no copies of records between calls; every mutation
/// is a read followed by a conditional write in the backing store.
#[async_trait]
pub trait CapabilityStore: Send + Sync + Debug {
    /// Store a new capability
    async fn create(&self, capability: &Capability) -> Result<(), ShareError>;

    /// Fetch a capability by id
    async fn get(&self, id: &CapabilityId) -> Result<Option<Capability>, ShareError>;

    /// Every capability for `file`, oldest first
    async fn by_file(&self, file: &FileId) -> Result<Vec<Capability>, ShareError>;

    /// Every capability created by `owner`, oldest first
    async fn by_owner(&self, owner: &UserId) -> Result<Vec<Capability>, ShareError>;

    /// Every capability, for maintenance jobs
    async fn all(&self) -> Result<Vec<Capability>, ShareError>;

    /// Overwrite a stored capability. Fails with [ShareError::NotFound] if it
    /// is absent.
    async fn replace(&self, capability: &Capability) -> Result<(), ShareError>;

    /// Mark a capability revoked at `at`. Returns it as stored afterwards, or
    /// `None` if it does not exist.
    async fn revoke(
        &self,
        id: &CapabilityId,
        at: DateTime<Utc>,
    ) -> Result<Option<Capability>, ShareError>;

    /// Add one to the access count. Returns the new count, or `None` if the
    /// capability does not exist.
    async fn record_access(&self, id: &CapabilityId) -> Result<Option<u64>, ShareError>;

    /// Delete a capability. Returns whether it existed.
    async fn delete(&self, id: &CapabilityId) -> Result<bool, ShareError>;
}

/// A [CapabilityStore] over a document [Collection].
///
/// Revocation and access counting use the collection's retrying
/// compare-and-swap update, so concurrent resolutions are all counted and a
/// revoke racing with them is never lost.
#[derive(Debug, Clone)]
pub struct DocumentCapabilityStore<B, E = JsonEncoder>
where
    B: DocumentBackend,
{
    shares: Collection<Capability, B, E>,
}

impl<B> DocumentCapabilityStore<B>
where
    B: DocumentBackend,
{
    /// Store capabilities as JSON documents in `backend`
    pub fn new(backend: B) -> Self {
        Self {
            shares: Collection::new(backend),
        }
    }
}

impl<B, E> DocumentCapabilityStore<B, E>
where
    B: DocumentBackend,
    E: Encoder,
{
    /// Store capabilities in an existing collection
    pub fn from_collection(shares: Collection<Capability, B, E>) -> Self {
        Self { shares }
    }

    async fn scan_sorted<F>(&self, filter: F) -> Result<Vec<Capability>, ShareError>
    where
        F: Fn(&Capability) -> bool + Send,
    {
        let mut shares = self.shares.scan(filter).await?;
        shares.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(shares)
    }
}

#[async_trait]
impl<B, E> CapabilityStore for DocumentCapabilityStore<B, E>
where
    B: DocumentBackend + 'static,
    E: Encoder + Debug + 'static,
{
    async fn create(&self, capability: &Capability) -> Result<(), ShareError> {
        Ok(self.shares.create(capability).await?)
    }

    async fn get(&self, id: &CapabilityId) -> Result<Option<Capability>, ShareError> {
        Ok(self.shares.get(id.as_str()).await?)
    }

    async fn by_file(&self, file: &FileId) -> Result<Vec<Capability>, ShareError> {
        self.scan_sorted(|capability| capability.file() == file).await
    }

    async fn by_owner(&self, owner: &UserId) -> Result<Vec<Capability>, ShareError> {
        self.scan_sorted(|capability| capability.owner() == owner)
            .await
    }

    async fn all(&self) -> Result<Vec<Capability>, ShareError> {
        self.scan_sorted(|_| true).await
    }

    async fn replace(&self, capability: &Capability) -> Result<(), ShareError> {
        match self.shares.replace(capability).await {
            Ok(()) => Ok(()),
            Err(SatchelStorageError::Missing(_)) => Err(ShareError::NotFound(Entity::Share)),
            Err(error) => Err(error.into()),
        }
    }

    async fn revoke(
        &self,
        id: &CapabilityId,
        at: DateTime<Utc>,
    ) -> Result<Option<Capability>, ShareError> {
        Ok(self
            .shares
            .update(id.as_str(), |capability| capability.revoke(at))
            .await?)
    }

    async fn record_access(&self, id: &CapabilityId) -> Result<Option<u64>, ShareError> {
        Ok(self
            .shares
            .update(id.as_str(), |capability| {
                capability.record_access();
                true
            })
            .await?
            .map(|capability| capability.access_count()))
    }

    async fn delete(&self, id: &CapabilityId) -> Result<bool, ShareError> {
        Ok(self.shares.remove(id.as_str()).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ShareDuration;
    use anyhow::Result;
    use chrono::Duration;
    use satchel_storage::{MemoryBackend, UpdatePolicy, make_fs_backend};

    fn issue(file: &str, owner: &str, age: Duration) -> Capability {
        Capability::issue(
            CapabilityId::generate(),
            FileId::new(file),
            UserId::new(owner),
            Some(ShareDuration::Week),
            Utc::now() - age,
        )
    }

    #[tokio::test]
    async fn it_queries_by_file_and_owner() -> Result<()> {
        let store = DocumentCapabilityStore::new(MemoryBackend::default());
        let older = issue("f1", "alice", Duration::hours(2));
        let newer = issue("f1", "alice", Duration::hours(1));
        let elsewhere = issue("f2", "bob", Duration::zero());
        for capability in [&newer, &elsewhere, &older] {
            store.create(capability).await?;
        }

        assert_eq!(
            store.by_file(&FileId::new("f1")).await?,
            vec![older.clone(), newer.clone()]
        );
        assert_eq!(store.by_owner(&UserId::new("bob")).await?, vec![elsewhere]);
        assert_eq!(store.all().await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn it_revokes_once_and_keeps_it() -> Result<()> {
        let store = DocumentCapabilityStore::new(MemoryBackend::default());
        let capability = issue("f1", "alice", Duration::zero());
        store.create(&capability).await?;

        let now = Utc::now();
        let revoked = store.revoke(capability.id(), now).await?.unwrap();
        let again = store
            .revoke(capability.id(), now + Duration::minutes(1))
            .await?
            .unwrap();

        assert!(revoked.is_revoked());
        assert_eq!(revoked, again);
        assert_eq!(
            store.revoke(&CapabilityId::new("missing"), now).await?,
            None
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_to_replace_an_absent_capability() -> Result<()> {
        let store = DocumentCapabilityStore::new(MemoryBackend::default());

        let result = store.replace(&issue("f1", "alice", Duration::zero())).await;

        assert_eq!(result, Err(ShareError::NotFound(Entity::Share)));
        Ok(())
    }

    #[tokio::test]
    async fn it_counts_every_concurrent_access() -> Result<()> {
        let collection =
            Collection::new(MemoryBackend::default()).with_policy(UpdatePolicy::MaxRetries(128));
        let store = Arc::new(DocumentCapabilityStore::from_collection(collection));
        let capability = issue("f1", "alice", Duration::zero());
        store.create(&capability).await?;

        let mut tasks = Vec::new();
        for _ in 0..25 {
            let store = store.clone();
            let id = capability.id().clone();
            tasks.push(tokio::spawn(async move { store.record_access(&id).await }));
        }
        for task in tasks {
            task.await??;
        }

        let stored = store.get(capability.id()).await?.unwrap();
        assert_eq!(stored.access_count(), 25);
        Ok(())
    }

    #[tokio::test]
    async fn it_persists_on_the_filesystem() -> Result<()> {
        let (backend, root) = make_fs_backend().await?;
        let store = DocumentCapabilityStore::new(backend);
        let capability = issue("f1", "alice", Duration::zero());
        store.create(&capability).await?;
        store.record_access(capability.id()).await?;

        let reopened = DocumentCapabilityStore::new(
            satchel_storage::FileSystemBackend::new(root.path()).await?,
        );
        let stored = reopened.get(capability.id()).await?.unwrap();

        assert_eq!(stored.access_count(), 1);
        assert!(reopened.delete(capability.id()).await?);
        assert_eq!(reopened.get(capability.id()).await?, None);
        Ok(())
    }
}
