use std::{fmt::Debug, marker::PhantomData};

use serde::{Serialize, de::DeserializeOwned};

use crate::{DocumentBackend, Encoder, JsonEncoder, SatchelStorageError};

/// A record that lives in a [Collection].
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + Debug {
    /// Key prefix shared by every document of this type
    const COLLECTION: &'static str;

    /// The document's identifier, unique within its collection
    fn id(&self) -> &str;
}

/// How many times [Collection::update] re-reads and retries after losing a
/// compare-and-swap race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Give up after this many attempts
    MaxRetries(usize),
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::MaxRetries(8)
    }
}

impl UpdatePolicy {
    fn attempts(&self) -> usize {
        match self {
            UpdatePolicy::MaxRetries(retries) => (*retries).max(1),
        }
    }
}

/// A typed view over the documents of one kind in a [DocumentBackend].
///
/// Documents are stored under `<COLLECTION>/<id>`. Every mutation is a
/// read followed by a conditional replace against the edition that was read.
#[derive(Debug, Clone)]
pub struct Collection<D, B, E = JsonEncoder>
where
    B: DocumentBackend,
{
    backend: B,
    encoder: E,
    policy: UpdatePolicy,
    document: PhantomData<fn() -> D>,
}

impl<D, B> Collection<D, B, JsonEncoder>
where
    D: Document,
    B: DocumentBackend,
{
    /// A collection over `backend` that stores documents as JSON
    pub fn new(backend: B) -> Self {
        Self::with_encoder(backend, JsonEncoder)
    }
}

impl<D, B, E> Collection<D, B, E>
where
    D: Document,
    B: DocumentBackend,
    E: Encoder,
{
    /// A collection over `backend` that stores documents with `encoder`
    pub fn with_encoder(backend: B, encoder: E) -> Self {
        Self {
            backend,
            encoder,
            policy: UpdatePolicy::default(),
            document: PhantomData,
        }
    }

    /// Replace the retry policy used by [Collection::update]
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(id: &str) -> String {
        format!("{}/{}", D::COLLECTION, id)
    }

    async fn load(&self, key: &str) -> Result<Option<(D, B::Edition)>, SatchelStorageError> {
        match self.backend.resolve(key).await? {
            Some((bytes, edition)) => Ok(Some((self.encoder.decode(&bytes).await?, edition))),
            None => Ok(None),
        }
    }

    /// Store a new document. Fails with [SatchelStorageError::AlreadyExists]
    /// if its id is taken.
    pub async fn create(&self, document: &D) -> Result<(), SatchelStorageError> {
        let key = Self::key(document.id());
        let bytes = self.encoder.encode(document).await?;

        match self.backend.replace(&key, None, Some(bytes)).await {
            Ok(_) => Ok(()),
            Err(SatchelStorageError::Conflict(_)) => Err(SatchelStorageError::AlreadyExists(key)),
            Err(error) => Err(error),
        }
    }

    /// Fetch a document by id
    pub async fn get(&self, id: &str) -> Result<Option<D>, SatchelStorageError> {
        Ok(self.load(&Self::key(id)).await?.map(|(document, _)| document))
    }

    /// Every document for which `filter` holds, ordered by key.
    ///
    /// Documents deleted between listing and reading are skipped.
    pub async fn scan<F>(&self, filter: F) -> Result<Vec<D>, SatchelStorageError>
    where
        F: Fn(&D) -> bool + Send,
    {
        let prefix = format!("{}/", D::COLLECTION);
        let mut documents = Vec::new();

        for key in self.backend.keys(&prefix).await? {
            if let Some((document, _)) = self.load(&key).await? {
                if filter(&document) {
                    documents.push(document);
                }
            }
        }

        Ok(documents)
    }

    /// Overwrite a document with `document`, as long as nobody else wrote it
    /// since it was read here. Fails with [SatchelStorageError::Missing] if
    /// it does not exist and [SatchelStorageError::Conflict] on a lost race.
    pub async fn replace(&self, document: &D) -> Result<(), SatchelStorageError> {
        let key = Self::key(document.id());
        let Some((_, edition)) = self.backend.resolve(&key).await? else {
            return Err(SatchelStorageError::Missing(key));
        };
        let bytes = self.encoder.encode(document).await?;

        self.backend
            .replace(&key, Some(&edition), Some(bytes))
            .await?;
        Ok(())
    }

    /// Apply `change` to the stored document and write it back, re-reading and
    /// retrying when another writer got there first.
    ///
    /// `change` returns `false` to leave the document untouched. Returns the
    /// document as stored afterwards, or `None` if it does not exist.
    pub async fn update<F>(&self, id: &str, change: F) -> Result<Option<D>, SatchelStorageError>
    where
        F: Fn(&mut D) -> bool + Send + Sync,
    {
        let key = Self::key(id);
        let attempts = self.policy.attempts();

        for attempt in 1..=attempts {
            let Some((mut document, edition)) = self.load(&key).await? else {
                return Ok(None);
            };

            if !change(&mut document) {
                return Ok(Some(document));
            }

            let bytes = self.encoder.encode(&document).await?;
            match self.backend.replace(&key, Some(&edition), Some(bytes)).await {
                Ok(_) => return Ok(Some(document)),
                Err(SatchelStorageError::Conflict(_)) if attempt < attempts => {
                    tracing::debug!(key = %key, attempt, "Edition conflict, retrying update");
                }
                Err(error) => return Err(error),
            }
        }

        Err(SatchelStorageError::Conflict(key))
    }

    /// Delete a document. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, SatchelStorageError> {
        let key = Self::key(id);
        let Some((_, edition)) = self.backend.resolve(&key).await? else {
            return Ok(false);
        };

        self.backend.replace(&key, Some(&edition), None).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{CborEncoder, MemoryBackend, make_fs_backend};
    use anyhow::Result;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        owner: String,
        hits: u64,
    }

    impl Document for Counter {
        const COLLECTION: &'static str = "counters";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn counter(id: &str, owner: &str) -> Counter {
        Counter {
            id: id.into(),
            owner: owner.into(),
            hits: 0,
        }
    }

    #[tokio::test]
    async fn it_creates_and_gets_a_document() -> Result<()> {
        let counters = Collection::<Counter, _>::new(MemoryBackend::default());

        counters.create(&counter("a", "alice")).await?;

        assert_eq!(counters.get("a").await?, Some(counter("a", "alice")));
        assert_eq!(counters.get("b").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_duplicate_ids() -> Result<()> {
        let counters = Collection::<Counter, _>::new(MemoryBackend::default());

        counters.create(&counter("a", "alice")).await?;
        let duplicate = counters.create(&counter("a", "bob")).await;

        assert!(matches!(duplicate, Err(SatchelStorageError::AlreadyExists(_))));
        assert_eq!(counters.get("a").await?.unwrap().owner, "alice");
        Ok(())
    }

    #[tokio::test]
    async fn it_scans_with_a_filter() -> Result<()> {
        let counters = Collection::<Counter, _>::new(MemoryBackend::default());
        for (id, owner) in [("a", "alice"), ("b", "bob"), ("c", "alice")] {
            counters.create(&counter(id, owner)).await?;
        }

        let owned = counters.scan(|c| c.owner == "alice").await?;

        assert_eq!(
            owned.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_does_not_replace_a_missing_document() -> Result<()> {
        let counters = Collection::<Counter, _>::new(MemoryBackend::default());

        let result = counters.replace(&counter("a", "alice")).await;

        assert!(matches!(result, Err(SatchelStorageError::Missing(_))));
        Ok(())
    }

    #[tokio::test]
    async fn it_updates_and_removes() -> Result<()> {
        let counters = Collection::<Counter, _>::new(MemoryBackend::default());
        counters.create(&counter("a", "alice")).await?;

        let updated = counters
            .update("a", |c| {
                c.hits += 1;
                true
            })
            .await?;

        assert_eq!(updated.map(|c| c.hits), Some(1));
        assert!(counters.remove("a").await?);
        assert!(!counters.remove("a").await?);
        assert_eq!(counters.update("a", |_| true).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn it_does_not_lose_concurrent_updates() -> Result<()> {
        let counters = Arc::new(
            Collection::<Counter, _>::new(MemoryBackend::default())
                .with_policy(UpdatePolicy::MaxRetries(64)),
        );
        counters.create(&counter("a", "alice")).await?;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let counters = counters.clone();
            tasks.push(tokio::spawn(async move {
                counters
                    .update("a", |c| {
                        c.hits += 1;
                        true
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await??;
        }

        assert_eq!(counters.get("a").await?.map(|c| c.hits), Some(16));
        Ok(())
    }

    #[tokio::test]
    async fn it_works_over_cbor_on_the_filesystem() -> Result<()> {
        let (backend, _root) = make_fs_backend().await?;
        let counters = Collection::<Counter, _, _>::with_encoder(backend, CborEncoder);

        counters.create(&counter("a", "alice")).await?;
        counters
            .update("a", |c| {
                c.hits = 5;
                true
            })
            .await?;

        assert_eq!(counters.get("a").await?.map(|c| c.hits), Some(5));
        Ok(())
    }
}
