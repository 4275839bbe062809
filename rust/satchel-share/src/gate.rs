//! The ownership gate.

use crate::{Capability, Entity, FileRecord, ShareError, UserId};

/// Something that belongs to exactly one user
pub trait Owned {
    /// The kind of record, for error reporting
    const ENTITY: Entity;

    /// The owning user
    fn owner(&self) -> &UserId;
}

impl Owned for FileRecord {
    const ENTITY: Entity = Entity::File;

    fn owner(&self) -> &UserId {
        &self.owner
    }
}

impl Owned for Capability {
    const ENTITY: Entity = Entity::Share;

    fn owner(&self) -> &UserId {
        Capability::owner(self)
    }
}

/// Let `caller` through only if they own `record`.
///
/// Applied before every mutation and owner-only listing. Share resolution is
/// anonymous and never passes through here.
pub fn authorize<T: Owned>(caller: &UserId, record: &T) -> Result<(), ShareError> {
    if record.owner() == caller {
        Ok(())
    } else {
        tracing::debug!(%caller, owner = %record.owner(), entity = %T::ENTITY, "Ownership check failed");
        Err(ShareError::Unauthorized(T::ENTITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CapabilityId, FileId};
    use chrono::Utc;

    #[test]
    fn it_admits_only_the_owner() {
        let capability = Capability::issue(
            CapabilityId::new("c"),
            FileId::new("f"),
            UserId::new("alice"),
            None,
            Utc::now(),
        );

        assert_eq!(authorize(&UserId::new("alice"), &capability), Ok(()));
        assert_eq!(
            authorize(&UserId::new("mallory"), &capability),
            Err(ShareError::Unauthorized(Entity::Share))
        );
    }
}
