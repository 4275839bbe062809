use std::fmt::Display;

use satchel_storage::{ObjectStoreError, SatchelStorageError};
use serde::Serialize;
use thiserror::Error;

/// The kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// An uploaded file
    File,
    /// A share capability
    Share,
}

impl Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::File => f.write_str("file"),
            Entity::Share => f.write_str("share"),
        }
    }
}

/// Everything that can go wrong while managing or resolving shares.
///
/// Authorization and validity failures keep their specific kind all the way
/// to the caller. Infrastructure failures carry the backend's message for
/// logs only; callers should surface nothing but the retry hint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The record does not exist, or is not in a state where it may be seen
    #[error("{0} not found")]
    NotFound(Entity),

    /// The caller does not own the record
    #[error("caller does not own this {0}")]
    Unauthorized(Entity),

    /// The share link is past its expiry
    #[error("share link has expired")]
    Expired,

    /// The share link was revoked by its owner
    #[error("share link has been revoked")]
    Revoked,

    /// The operation is not allowed in the record's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller supplied an unusable value
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The object store could not sign a read credential
    #[error("could not mint a read credential: {0}")]
    MintingFailed(String),

    /// A backing service failed
    #[error("infrastructure failure: {message}")]
    Infrastructure {
        /// Diagnostic text from the backend
        message: String,
        /// Whether the same call may succeed later
        retryable: bool,
    },
}

impl ShareError {
    /// Whether the same call may succeed if issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShareError::Infrastructure {
                retryable: true,
                ..
            }
        )
    }
}

impl From<SatchelStorageError> for ShareError {
    fn from(error: SatchelStorageError) -> Self {
        ShareError::Infrastructure {
            retryable: error.is_retryable() || matches!(error, SatchelStorageError::AlreadyExists(_)),
            message: error.to_string(),
        }
    }
}

impl From<ObjectStoreError> for ShareError {
    fn from(error: ObjectStoreError) -> Self {
        match error {
            ObjectStoreError::Minting(error) => ShareError::MintingFailed(error.to_string()),
            error => ShareError::Infrastructure {
                retryable: error.is_retryable(),
                message: error.to_string(),
            },
        }
    }
}
