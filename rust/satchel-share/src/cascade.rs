//! Retiring the capabilities of a deleted file.

use serde::Serialize;
use tracing::instrument;

use crate::{CapabilityId, FileId, Handles, ShareError};

/// What a cascade managed to delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Capabilities deleted
    pub retired: Vec<CapabilityId>,
    /// Capabilities that could not be deleted. They can no longer be
    /// resolved once the file record is gone, and the sweeper removes them.
    pub failed: Vec<CapabilityId>,
}

impl CascadeReport {
    /// Whether every capability was deleted
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The cascade coordinator.
#[derive(Debug, Clone)]
pub struct Cascade {
    handles: Handles,
}

impl Cascade {
    /// A coordinator over `handles`
    pub fn new(handles: Handles) -> Self {
        Self { handles }
    }

    /// Delete every capability pointing at `file`, carrying on past
    /// individual failures. Only failing to enumerate them is an error.
    #[instrument(skip_all, fields(file = %file))]
    pub async fn retire(&self, file: &FileId) -> Result<CascadeReport, ShareError> {
        let mut report = CascadeReport::default();

        for capability in self.handles.shares.by_file(file).await? {
            let id = capability.id().clone();
            match self.handles.shares.delete(&id).await {
                Ok(_) => report.retired.push(id),
                Err(error) => {
                    tracing::warn!(share = %id, %error, "Failed to retire share");
                    report.failed.push(id);
                }
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                retired = report.retired.len(),
                failed = report.failed.len(),
                "Cascade left shares behind"
            );
        }

        Ok(report)
    }
}
