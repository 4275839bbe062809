//! A user's files: upload, listing, renaming, trash and deletion.

use serde::Serialize;
use tracing::instrument;

use crate::{
    Cascade, CascadeReport, Entity, FileId, FileRecord, FileStatus, Handles, ShareError, UserId,
    authorize,
};

/// Longest accepted file name, in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Outcome of permanently deleting a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// The deleted file
    pub file: FileId,
    /// Shares retired along with it; `None` if they could not be enumerated
    pub cascade: Option<CascadeReport>,
    /// Whether the stored bytes were removed too
    pub object_deleted: bool,
}

/// File management on behalf of logged-in users. Every operation on an
/// existing file passes through the ownership gate.
#[derive(Debug, Clone)]
pub struct Library {
    handles: Handles,
    cascade: Cascade,
}

fn validate_name(name: &str) -> Result<String, ShareError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShareError::InvalidRequest("file name is empty".into()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ShareError::InvalidRequest(format!(
            "file name is longer than {MAX_NAME_LENGTH} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ShareError::InvalidRequest(
            "file name contains control characters".into(),
        ));
    }
    Ok(name.to_owned())
}

impl Library {
    /// A library over `handles`
    pub fn new(handles: Handles) -> Self {
        Self {
            cascade: Cascade::new(handles.clone()),
            handles,
        }
    }

    /// Store `bytes` as a new file owned by `caller`
    #[instrument(skip_all, fields(caller = %caller, size = bytes.len()))]
    pub async fn upload(
        &self,
        caller: &UserId,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FileRecord, ShareError> {
        let name = validate_name(name)?;
        let id = FileId::generate();
        let record = FileRecord {
            object_key: FileRecord::object_key_for(caller, &id),
            id,
            owner: caller.clone(),
            name,
            content_type: content_type.to_owned(),
            size: bytes.len() as u64,
            status: FileStatus::Active,
            uploaded_at: self.handles.clock.now(),
            deleted_at: None,
        };

        self.handles
            .objects
            .put(&record.object_key, bytes, content_type)
            .await?;

        if let Err(error) = self.handles.files.create(&record).await {
            if let Err(cleanup) = self.handles.objects.delete(&record.object_key).await {
                tracing::warn!(key = %record.object_key, error = %cleanup, "Failed to remove orphaned object");
            }
            return Err(error);
        }

        tracing::info!(file = %record.id, "Uploaded file");
        Ok(record)
    }

    /// Every file `caller` uploaded, trashed ones included, oldest first
    pub async fn list(&self, caller: &UserId) -> Result<Vec<FileRecord>, ShareError> {
        self.handles.files.by_owner(caller).await
    }

    /// A file `caller` owns
    pub async fn get(&self, caller: &UserId, id: &FileId) -> Result<FileRecord, ShareError> {
        let record = self
            .handles
            .files
            .get_file(id)
            .await?
            .ok_or(ShareError::NotFound(Entity::File))?;
        authorize(caller, &record)?;
        Ok(record)
    }

    /// Give an active file a new display name
    #[instrument(skip_all, fields(caller = %caller, file = %id))]
    pub async fn rename(
        &self,
        caller: &UserId,
        id: &FileId,
        name: &str,
    ) -> Result<FileRecord, ShareError> {
        let name = validate_name(name)?;
        let record = self.get(caller, id).await?;
        if !record.is_active() {
            return Err(ShareError::InvalidState(
                "trashed files cannot be renamed".into(),
            ));
        }

        let renamed = self
            .handles
            .files
            .rename(id, &name)
            .await?
            .ok_or(ShareError::NotFound(Entity::File))?;
        if renamed.name != name {
            // Trashed between the check above and the write
            return Err(ShareError::InvalidState(
                "trashed files cannot be renamed".into(),
            ));
        }
        Ok(renamed)
    }

    /// Move a file to the trash. Its shares stop resolving but are kept until
    /// the file is deleted for good.
    #[instrument(skip_all, fields(caller = %caller, file = %id))]
    pub async fn trash(&self, caller: &UserId, id: &FileId) -> Result<FileRecord, ShareError> {
        self.get(caller, id).await?;
        let at = self.handles.clock.now();

        self.handles
            .files
            .trash(id, at)
            .await?
            .ok_or(ShareError::NotFound(Entity::File))
    }

    /// Permanently delete a file: retire its shares, remove its bytes and
    /// finally its record.
    ///
    /// Share and object removal are best effort; their failures are logged
    /// and reported, and never stop the record from being deleted.
    #[instrument(skip_all, fields(caller = %caller, file = %id))]
    pub async fn delete(&self, caller: &UserId, id: &FileId) -> Result<DeletionReport, ShareError> {
        let record = self.get(caller, id).await?;

        let cascade = match self.cascade.retire(id).await {
            Ok(report) => Some(report),
            Err(error) => {
                tracing::warn!(%error, "Could not enumerate shares to retire");
                None
            }
        };

        let object_deleted = match self.handles.objects.delete(&record.object_key).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(key = %record.object_key, %error, "Failed to delete object");
                false
            }
        };

        self.handles.files.remove(id).await?;

        tracing::info!("Deleted file");
        Ok(DeletionReport {
            file: record.id,
            cascade,
            object_deleted,
        })
    }
}
