use std::fmt::Debug;

use async_trait::async_trait;

use crate::SatchelStorageError;

mod memory;
pub use memory::*;

mod fs;
pub use fs::*;

/// A [DocumentBackend] stores byte values against string keys and versions
/// every value with an edition.
///
/// Writes are compare-and-swap: [DocumentBackend::replace] only succeeds when
/// the caller names the edition currently stored (or `None` when the key is
/// vacant). This is the sole synchronization point for metadata; callers keep
/// no shared mutable copies of documents.
#[async_trait]
pub trait DocumentBackend: Clone + Send + Sync + Debug {
    /// Opaque version of a stored value
    type Edition: Clone + PartialEq + Send + Sync + Debug;

    /// Retrieve the value and edition stored at `key`, if any
    async fn resolve(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, Self::Edition)>, SatchelStorageError>;

    /// Store `content` at `key` if the current edition equals `edition`.
    /// `None` content deletes the key. Returns the new edition, or `None`
    /// after a delete.
    ///
    /// Fails with [SatchelStorageError::Conflict] on an edition mismatch.
    async fn replace(
        &self,
        key: &str,
        edition: Option<&Self::Edition>,
        content: Option<Vec<u8>>,
    ) -> Result<Option<Self::Edition>, SatchelStorageError>;

    /// All keys starting with `prefix`, in lexicographic order
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, SatchelStorageError>;
}
