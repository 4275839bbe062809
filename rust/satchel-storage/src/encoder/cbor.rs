use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use super::Encoder;
use crate::SatchelStorageError;

/// Encodes documents as IPLD-compatible CBOR
#[derive(Debug, Clone, Copy, Default)]
pub struct CborEncoder;

#[async_trait]
impl Encoder for CborEncoder {
    async fn encode<T>(&self, document: &T) -> Result<Vec<u8>, SatchelStorageError>
    where
        T: Serialize + Sync,
    {
        serde_ipld_dagcbor::to_vec(document)
            .map_err(|error| SatchelStorageError::EncodeFailed(format!("{error}")))
    }

    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, SatchelStorageError>
    where
        T: DeserializeOwned + Send,
    {
        serde_ipld_dagcbor::from_slice::<T>(bytes)
            .map_err(|error| SatchelStorageError::DecodeFailed(format!("{error}")))
    }
}
