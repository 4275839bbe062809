//! Anonymous share-link resolution.

use satchel_s3_credentials::{Presentation, ReadCredential};
use serde::Serialize;
use tracing::instrument;

use crate::{CapabilityId, Entity, FileMetadata, Handles, LifetimePolicy, ShareError, Validity};

/// What a visitor gets for a valid share link: enough to show the file and a
/// short-lived URL to download it. Never the bucket key or the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Public file metadata
    pub file: FileMetadata,
    /// Read-only download URL
    pub credential: ReadCredential,
}

/// The access endpoint orchestrator.
#[derive(Debug, Clone)]
pub struct Resolver {
    handles: Handles,
    policy: LifetimePolicy,
}

impl Resolver {
    /// A resolver with the default [LifetimePolicy]
    pub fn new(handles: Handles) -> Self {
        Self {
            handles,
            policy: LifetimePolicy::default(),
        }
    }

    /// Replace the lifetime policy
    pub fn with_policy(mut self, policy: LifetimePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve a share link.
    ///
    /// Looks the capability up, validates it, checks its file is still
    /// active, mints a bounded read credential and then counts the access.
    /// A failure to count is logged and does not fail the resolution.
    #[instrument(skip_all, fields(share = %id))]
    pub async fn resolve(&self, id: &CapabilityId) -> Result<Resolution, ShareError> {
        if !id.is_well_formed() {
            return Err(ShareError::NotFound(Entity::Share));
        }

        let capability = self
            .handles
            .shares
            .get(id)
            .await?
            .ok_or(ShareError::NotFound(Entity::Share))?;

        let now = self.handles.clock.now();
        match capability.validate(now) {
            Validity::Active => {}
            Validity::Expired => return Err(ShareError::Expired),
            Validity::Revoked => return Err(ShareError::Revoked),
        }

        let file = self
            .handles
            .files
            .get_file(capability.file())
            .await?
            .filter(|file| file.is_active())
            .ok_or(ShareError::NotFound(Entity::File))?;

        let lifetime = self.policy.grant(
            self.handles.objects.ceiling(),
            capability.expires_at().remaining(now),
        );
        let presentation = Presentation {
            content_type: Some(file.content_type.clone()),
            file_name: Some(file.name.clone()),
        };
        let credential = self
            .handles
            .objects
            .mint_read_credential(&file.object_key, lifetime, &presentation)
            .map_err(|error| {
                tracing::error!(%error, "Could not mint a read credential");
                ShareError::from(error)
            })?;

        match self.handles.shares.record_access(id).await {
            Ok(Some(count)) => tracing::debug!(count, "Recorded access"),
            Ok(None) => tracing::warn!("Share vanished before its access was recorded"),
            Err(error) => tracing::warn!(%error, "Failed to record access"),
        }

        Ok(Resolution {
            file: FileMetadata::from(&file),
            credential,
        })
    }
}
