//! Files as seen by the share subsystem.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use satchel_storage::{Collection, Document, DocumentBackend, Encoder, JsonEncoder, ObjectKey};
use serde::{Deserialize, Serialize};

use crate::{FileId, ShareError, UserId};

/// Lifecycle state of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Visible and shareable
    Active,
    /// In the trash; shares pointing at it no longer resolve
    Deleted,
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Identifier
    pub id: FileId,
    /// The user who uploaded the file
    pub owner: UserId,
    /// Display name
    pub name: String,
    /// MIME type given at upload
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    /// Where the bytes live in the object store
    pub object_key: ObjectKey,
    /// Lifecycle state
    pub status: FileStatus,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
    /// When the file was moved to the trash
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Whether shares may be created for or resolved against this file
    pub fn is_active(&self) -> bool {
        self.status == FileStatus::Active
    }

    /// The object key for a new upload
    pub fn object_key_for(owner: &UserId, id: &FileId) -> ObjectKey {
        ObjectKey::new(format!("files/{owner}/{id}"))
    }
}

impl Document for FileRecord {
    const COLLECTION: &'static str = "files";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// What an anonymous visitor learns about a shared file. Storage coordinates
/// and the owner are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    /// Display name
    pub name: String,
    /// MIME type
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    /// Upload time
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FileRecord> for FileMetadata {
    fn from(record: &FileRecord) -> Self {
        Self {
            name: record.name.clone(),
            content_type: record.content_type.clone(),
            size: record.size,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// Persistence for [FileRecord]s.
#[async_trait]
pub trait FileRegistry: Send + Sync + Debug {
    /// Fetch a file by id, whatever its status
    async fn get_file(&self, id: &FileId) -> Result<Option<FileRecord>, ShareError>;

    /// Store a new file record
    async fn create(&self, record: &FileRecord) -> Result<(), ShareError>;

    /// Every file uploaded by `owner`
    async fn by_owner(&self, owner: &UserId) -> Result<Vec<FileRecord>, ShareError>;

    /// Change the display name of an active file. Returns the file as stored
    /// afterwards, or `None` if it does not exist.
    async fn rename(&self, id: &FileId, name: &str) -> Result<Option<FileRecord>, ShareError>;

    /// Move a file to the trash. Trashing twice keeps the first timestamp.
    async fn trash(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, ShareError>;

    /// Delete the record. Returns whether it existed.
    async fn remove(&self, id: &FileId) -> Result<bool, ShareError>;
}

/// A [FileRegistry] over a document [Collection].
#[derive(Debug, Clone)]
pub struct DocumentFiles<B, E = JsonEncoder>
where
    B: DocumentBackend,
{
    files: Collection<FileRecord, B, E>,
}

impl<B> DocumentFiles<B>
where
    B: DocumentBackend,
{
    /// Store files as JSON documents in `backend`
    pub fn new(backend: B) -> Self {
        Self {
            files: Collection::new(backend),
        }
    }
}

impl<B, E> DocumentFiles<B, E>
where
    B: DocumentBackend,
    E: Encoder,
{
    /// Store files in an existing collection
    pub fn from_collection(files: Collection<FileRecord, B, E>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl<B, E> FileRegistry for DocumentFiles<B, E>
where
    B: DocumentBackend + 'static,
    E: Encoder + Debug + 'static,
{
    async fn get_file(&self, id: &FileId) -> Result<Option<FileRecord>, ShareError> {
        Ok(self.files.get(id.as_str()).await?)
    }

    async fn create(&self, record: &FileRecord) -> Result<(), ShareError> {
        Ok(self.files.create(record).await?)
    }

    async fn by_owner(&self, owner: &UserId) -> Result<Vec<FileRecord>, ShareError> {
        let mut files = self.files.scan(|file| &file.owner == owner).await?;
        files.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn rename(&self, id: &FileId, name: &str) -> Result<Option<FileRecord>, ShareError> {
        Ok(self
            .files
            .update(id.as_str(), |file| {
                if !file.is_active() || file.name == name {
                    return false;
                }
                file.name = name.to_owned();
                true
            })
            .await?)
    }

    async fn trash(
        &self,
        id: &FileId,
        at: DateTime<Utc>,
    ) -> Result<Option<FileRecord>, ShareError> {
        Ok(self
            .files
            .update(id.as_str(), |file| {
                if !file.is_active() {
                    return false;
                }
                file.status = FileStatus::Deleted;
                file.deleted_at = Some(at);
                true
            })
            .await?)
    }

    async fn remove(&self, id: &FileId) -> Result<bool, ShareError> {
        Ok(self.files.remove(id.as_str()).await?)
    }
}
