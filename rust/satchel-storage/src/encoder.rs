use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::SatchelStorageError;

mod cbor;
pub use cbor::*;

mod json;
pub use json::*;

/// An [Encoder] turns documents into bytes for a [DocumentBackend] and back.
///
/// [DocumentBackend]: crate::DocumentBackend
#[async_trait]
pub trait Encoder: Clone + Send + Sync {
    /// Encode a document
    async fn encode<T>(&self, document: &T) -> Result<Vec<u8>, SatchelStorageError>
    where
        T: Serialize + Sync;

    /// Decode a document
    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, SatchelStorageError>
    where
        T: DeserializeOwned + Send;
}
