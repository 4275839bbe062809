//! Creating, revoking, counting and listing capabilities.

use std::collections::HashMap;

use tracing::instrument;

use crate::{
    Capability, CapabilityId, Entity, FileId, FileRecord, Handles, ShareDuration, ShareError,
    UserId, authorize,
};

/// The capability lifecycle engine.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    handles: Handles,
}

impl Lifecycle {
    /// An engine over `handles`
    pub fn new(handles: Handles) -> Self {
        Self { handles }
    }

    async fn owned_file(&self, caller: &UserId, file: &FileId) -> Result<FileRecord, ShareError> {
        let record = self
            .handles
            .files
            .get_file(file)
            .await?
            .ok_or(ShareError::NotFound(Entity::File))?;
        authorize(caller, &record)?;
        Ok(record)
    }

    /// Share `file` on behalf of `caller`, who must own it. Without a
    /// duration the link stays valid until revoked.
    #[instrument(skip_all, fields(caller = %caller, file = %file))]
    pub async fn create(
        &self,
        caller: &UserId,
        file: &FileId,
        duration: Option<ShareDuration>,
    ) -> Result<Capability, ShareError> {
        let record = self.owned_file(caller, file).await?;
        if !record.is_active() {
            return Err(ShareError::InvalidState(
                "only active files can be shared".to_string(),
            ));
        }

        let capability = Capability::issue(
            CapabilityId::generate(),
            record.id,
            caller.clone(),
            duration,
            self.handles.clock.now(),
        );
        self.handles.shares.create(&capability).await?;

        tracing::info!(share = %capability.id(), expires_at = ?capability.expires_at(), "Created share");
        Ok(capability)
    }

    /// Revoke a capability. Revoking twice is a no-op for the owner; anyone
    /// else is refused every time.
    #[instrument(skip_all, fields(caller = %caller, share = %id))]
    pub async fn revoke(&self, caller: &UserId, id: &CapabilityId) -> Result<Capability, ShareError> {
        let capability = self
            .handles
            .shares
            .get(id)
            .await?
            .ok_or(ShareError::NotFound(Entity::Share))?;
        authorize(caller, &capability)?;

        if capability.is_revoked() {
            return Ok(capability);
        }

        let revoked = self
            .handles
            .shares
            .revoke(id, self.handles.clock.now())
            .await?
            .ok_or(ShareError::NotFound(Entity::Share))?;

        tracing::info!("Revoked share");
        Ok(revoked)
    }

    /// Count one successful resolution. Returns the new count, or `None` if
    /// the capability is gone.
    pub async fn record_access(&self, id: &CapabilityId) -> Result<Option<u64>, ShareError> {
        self.handles.shares.record_access(id).await
    }

    /// Every capability for a file `caller` owns
    #[instrument(skip_all, fields(caller = %caller, file = %file))]
    pub async fn list_by_file(
        &self,
        caller: &UserId,
        file: &FileId,
    ) -> Result<Vec<Capability>, ShareError> {
        self.owned_file(caller, file).await?;
        self.handles.shares.by_file(file).await
    }

    /// Every capability `caller` created
    pub async fn list_by_owner(&self, caller: &UserId) -> Result<Vec<Capability>, ShareError> {
        self.handles.shares.by_owner(caller).await
    }

    /// Which of the files behind `capabilities` are still active. A file
    /// that is gone from the registry counts as inactive.
    pub async fn file_states(
        &self,
        capabilities: &[Capability],
    ) -> Result<HashMap<FileId, bool>, ShareError> {
        let mut states = HashMap::new();
        for capability in capabilities {
            if states.contains_key(capability.file()) {
                continue;
            }
            let active = self
                .handles
                .files
                .get_file(capability.file())
                .await?
                .is_some_and(|record| record.is_active());
            states.insert(capability.file().clone(), active);
        }
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expiry, Fixture};
    use anyhow::Result;
    use chrono::Duration;

    #[tokio::test]
    async fn it_creates_a_share_for_an_owned_active_file() -> Result<()> {
        let fixture = Fixture::new()?;
        let file = fixture.upload("alice", "report.pdf").await?;

        let capability = fixture
            .lifecycle()
            .create(&fixture.user("alice"), &file.id, Some(ShareDuration::Day))
            .await?;

        assert_eq!(capability.file(), &file.id);
        assert_eq!(capability.owner(), &fixture.user("alice"));
        assert_eq!(
            capability.expires_at(),
            Expiry::At(fixture.now() + Duration::days(1))
        );
        assert_eq!(
            fixture.handles.shares.get(capability.id()).await?,
            Some(capability)
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_to_share_someone_elses_file() -> Result<()> {
        let fixture = Fixture::new()?;
        let file = fixture.upload("alice", "report.pdf").await?;

        let result = fixture
            .lifecycle()
            .create(&fixture.user("mallory"), &file.id, None)
            .await;

        assert_eq!(result, Err(ShareError::Unauthorized(Entity::File)));
        assert!(fixture.handles.shares.all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_to_share_a_missing_or_trashed_file() -> Result<()> {
        let fixture = Fixture::new()?;
        let alice = fixture.user("alice");
        let file = fixture.upload("alice", "report.pdf").await?;
        fixture.library().trash(&alice, &file.id).await?;

        let missing = fixture
            .lifecycle()
            .create(&alice, &FileId::new("nope"), None)
            .await;
        let trashed = fixture.lifecycle().create(&alice, &file.id, None).await;

        assert_eq!(missing, Err(ShareError::NotFound(Entity::File)));
        assert!(matches!(trashed, Err(ShareError::InvalidState(_))));
        Ok(())
    }

    #[tokio::test]
    async fn it_makes_owner_revocation_idempotent() -> Result<()> {
        let fixture = Fixture::new()?;
        let alice = fixture.user("alice");
        let capability = fixture.share("alice", None).await?;

        let first = fixture.lifecycle().revoke(&alice, capability.id()).await?;
        let second = fixture.lifecycle().revoke(&alice, capability.id()).await?;

        assert!(first.is_revoked());
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn it_refuses_revocation_by_anyone_else_every_time() -> Result<()> {
        let fixture = Fixture::new()?;
        let mallory = fixture.user("mallory");
        let capability = fixture.share("alice", None).await?;

        for _ in 0..2 {
            assert_eq!(
                fixture.lifecycle().revoke(&mallory, capability.id()).await,
                Err(ShareError::Unauthorized(Entity::Share))
            );
        }
        let stored = fixture.handles.shares.get(capability.id()).await?.unwrap();
        assert!(!stored.is_revoked());
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_unknown_shares_on_revoke() -> Result<()> {
        let fixture = Fixture::new()?;

        let result = fixture
            .lifecycle()
            .revoke(&fixture.user("alice"), &CapabilityId::new("nope"))
            .await;

        assert_eq!(result, Err(ShareError::NotFound(Entity::Share)));
        Ok(())
    }

    #[tokio::test]
    async fn it_lists_by_file_for_the_owner_only() -> Result<()> {
        let fixture = Fixture::new()?;
        let alice = fixture.user("alice");
        let file = fixture.upload("alice", "a.txt").await?;
        let lifecycle = fixture.lifecycle();
        let first = lifecycle.create(&alice, &file.id, None).await?;
        fixture.clock.advance(Duration::seconds(1));
        let second = lifecycle
            .create(&alice, &file.id, Some(ShareDuration::Week))
            .await?;

        assert_eq!(
            lifecycle.list_by_file(&alice, &file.id).await?,
            vec![first, second]
        );
        assert_eq!(
            lifecycle.list_by_file(&fixture.user("bob"), &file.id).await,
            Err(ShareError::Unauthorized(Entity::File))
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_lists_by_owner() -> Result<()> {
        let fixture = Fixture::new()?;
        let mine = fixture.share("alice", None).await?;
        fixture.share("bob", None).await?;

        let listed = fixture
            .lifecycle()
            .list_by_owner(&fixture.user("alice"))
            .await?;

        assert_eq!(listed, vec![mine]);
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_trashed_and_deleted_files_as_inactive() -> Result<()> {
        let fixture = Fixture::new()?;
        let alice = fixture.user("alice");
        let kept = fixture.share("alice", None).await?;
        let trashed = fixture.share("alice", None).await?;
        fixture.library().trash(&alice, trashed.file()).await?;
        let orphan = Capability::issue(
            CapabilityId::generate(),
            FileId::new("gone"),
            alice.clone(),
            None,
            fixture.now(),
        );

        let states = fixture
            .lifecycle()
            .file_states(&[kept.clone(), trashed.clone(), orphan.clone()])
            .await?;

        assert_eq!(states.get(kept.file()), Some(&true));
        assert_eq!(states.get(trashed.file()), Some(&false));
        assert_eq!(states.get(orphan.file()), Some(&false));
        Ok(())
    }
}
