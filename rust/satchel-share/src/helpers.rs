use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use satchel_common::ManualClock;
use satchel_s3_credentials::{Address, Credentials, Minter};
use satchel_storage::{DocumentBackend, MemoryBackend, MemoryObjectStore};

use crate::{
    Capability, CapabilityId, CapabilityStore, Cascade, DocumentCapabilityStore, DocumentFiles,
    FileId, FileRecord, Handles, Library, Lifecycle, Resolver, ShareDuration, ShareError, UserId,
};

/// An in-memory deployment with a hand-driven clock, for use in tests.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// The clock every component reads
    pub clock: ManualClock,
    /// The object store, for inspecting uploaded bytes
    pub objects: MemoryObjectStore,
    /// Handles wired to the in-memory backends
    pub handles: Handles,
}

impl Fixture {
    /// A fresh in-memory deployment whose clock reads 2026-03-01 12:00 UTC
    pub fn new() -> Result<Self> {
        Self::over(MemoryBackend::default())
    }

    /// Like [Fixture::new], with records kept in `documents`
    pub fn over<B>(documents: B) -> Result<Self>
    where
        B: DocumentBackend + 'static,
    {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let credentials = Credentials::new(
            Address::new("http://localhost:9000", "us-east-1", "satchel"),
            "satchel",
            "satchel-secret",
        )?;
        let objects = MemoryObjectStore::new(Minter::new(credentials, Arc::new(clock.clone())));

        let handles = Handles {
            shares: Arc::new(DocumentCapabilityStore::new(documents.clone())),
            files: Arc::new(DocumentFiles::new(documents)),
            objects: Arc::new(objects.clone()),
            clock: Arc::new(clock.clone()),
        };

        Ok(Self {
            clock,
            objects,
            handles,
        })
    }

    /// The same handles, with capabilities going through `shares`
    pub fn handles_with_shares(&self, shares: Arc<dyn CapabilityStore>) -> Handles {
        Handles {
            shares,
            ..self.handles.clone()
        }
    }

    /// A user id
    pub fn user(&self, name: &str) -> UserId {
        UserId::new(name)
    }

    /// The current fixture time
    pub fn now(&self) -> DateTime<Utc> {
        use satchel_common::Clock;
        self.clock.now()
    }

    /// A lifecycle engine over the fixture
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::new(self.handles.clone())
    }

    /// A file library over the fixture
    pub fn library(&self) -> Library {
        Library::new(self.handles.clone())
    }

    /// A resolver over the fixture
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.handles.clone())
    }

    /// A cascade coordinator over the fixture
    pub fn cascade(&self) -> Cascade {
        Cascade::new(self.handles.clone())
    }

    /// Upload a small text file owned by `owner`
    pub async fn upload(&self, owner: &str, name: &str) -> Result<FileRecord> {
        Ok(self
            .library()
            .upload(&self.user(owner), name, "text/plain", b"hello".to_vec())
            .await?)
    }

    /// Upload a file for `owner` and share it
    pub async fn share(&self, owner: &str, duration: Option<ShareDuration>) -> Result<Capability> {
        let file = self.upload(owner, "shared.txt").await?;
        Ok(self
            .lifecycle()
            .create(&self.user(owner), &file.id, duration)
            .await?)
    }
}

/// Wraps a [CapabilityStore] and fails chosen calls with a retryable
/// infrastructure error.
#[derive(Debug)]
pub struct FlakyCapabilityStore {
    inner: Arc<dyn CapabilityStore>,
    failing_deletes: Mutex<HashSet<CapabilityId>>,
    failing_record_access: Mutex<bool>,
}

impl FlakyCapabilityStore {
    /// Pass every call through to `inner` until told otherwise
    pub fn new(inner: Arc<dyn CapabilityStore>) -> Self {
        Self {
            inner,
            failing_deletes: Mutex::default(),
            failing_record_access: Mutex::new(false),
        }
    }

    /// Make deleting `id` fail
    pub fn fail_delete(&self, id: CapabilityId) {
        self.failing_deletes.lock().insert(id);
    }

    /// Make access counting fail
    pub fn fail_record_access(&self) {
        *self.failing_record_access.lock() = true;
    }

    fn outage() -> ShareError {
        ShareError::Infrastructure {
            message: "injected outage".into(),
            retryable: true,
        }
    }
}

#[async_trait]
impl CapabilityStore for FlakyCapabilityStore {
    async fn create(&self, capability: &Capability) -> Result<(), ShareError> {
        self.inner.create(capability).await
    }

    async fn get(&self, id: &CapabilityId) -> Result<Option<Capability>, ShareError> {
        self.inner.get(id).await
    }

    async fn by_file(&self, file: &FileId) -> Result<Vec<Capability>, ShareError> {
        self.inner.by_file(file).await
    }

    async fn by_owner(&self, owner: &UserId) -> Result<Vec<Capability>, ShareError> {
        self.inner.by_owner(owner).await
    }

    async fn all(&self) -> Result<Vec<Capability>, ShareError> {
        self.inner.all().await
    }

    async fn replace(&self, capability: &Capability) -> Result<(), ShareError> {
        self.inner.replace(capability).await
    }

    async fn revoke(
        &self,
        id: &CapabilityId,
        at: DateTime<Utc>,
    ) -> Result<Option<Capability>, ShareError> {
        self.inner.revoke(id, at).await
    }

    async fn record_access(&self, id: &CapabilityId) -> Result<Option<u64>, ShareError> {
        if *self.failing_record_access.lock() {
            return Err(Self::outage());
        }
        self.inner.record_access(id).await
    }

    async fn delete(&self, id: &CapabilityId) -> Result<bool, ShareError> {
        if self.failing_deletes.lock().contains(id) {
            return Err(Self::outage());
        }
        self.inner.delete(id).await
    }
}
