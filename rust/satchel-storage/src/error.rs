use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SatchelStorageError {
    /// A document could not be encoded
    #[error("Failed to encode a document: {0}")]
    EncodeFailed(String),

    /// Stored bytes could not be decoded
    #[error("Failed to decode a document: {0}")]
    DecodeFailed(String),

    /// The backend failed in a way that retrying will not fix
    #[error("Storage backend error: {0}")]
    StorageBackend(String),

    /// A compare-and-swap saw a different edition than the caller expected
    #[error("Edition mismatch at {0}")]
    Conflict(String),

    /// The key is already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The key holds nothing
    #[error("Not found: {0}")]
    Missing(String),

    /// The backend could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl SatchelStorageError {
    /// Whether the same call may succeed if issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}
