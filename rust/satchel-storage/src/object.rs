use std::fmt::{Debug, Display};

use async_trait::async_trait;
use chrono::Duration;
use satchel_s3_credentials::{AccessError, Presentation, ReadCredential};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;
pub use memory::*;

mod s3;
pub use s3::*;

/// Location of a blob inside the object store. Stored as a field of the file
/// record it belongs to, never recovered from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Wrap a raw key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors produced by an [ObjectStore]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    /// The store could not be reached or answered with a server error
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the operation
    #[error("Object store rejected the request: {0}")]
    Rejected(String),

    /// A read credential could not be produced
    #[error("Failed to mint a read credential: {0}")]
    Minting(#[from] AccessError),
}

impl ObjectStoreError {
    /// Whether the same call may succeed if issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Blob storage for uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Store `bytes` under `key`
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Remove the object at `key`. Removing an absent object succeeds.
    async fn delete(&self, key: &ObjectKey) -> Result<(), ObjectStoreError>;

    /// Produce a read-only URL for `key`, valid for at most `lifetime` and
    /// never longer than [ObjectStore::ceiling].
    fn mint_read_credential(
        &self,
        key: &ObjectKey,
        lifetime: Duration,
        presentation: &Presentation,
    ) -> Result<ReadCredential, ObjectStoreError>;

    /// The longest lifetime this store grants
    fn ceiling(&self) -> Duration;
}
