//! Share links as presented to their owners.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{Capability, CapabilityId, FileId, Validity};

/// The public base URL cannot have paths appended to it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} cannot serve as a share link base")]
pub struct InvalidLinkBase(pub String);

/// Derives share URLs from the configured public base. The URL is computed
/// on every response and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    base: Url,
}

impl ShareLinks {
    /// Links of the form `<base>/<capability id>`
    pub fn new(base: Url) -> Result<Self, InvalidLinkBase> {
        if base.cannot_be_a_base() {
            return Err(InvalidLinkBase(base.to_string()));
        }
        Ok(Self { base })
    }

    /// The public URL of a capability
    pub fn share_url(&self, id: &CapabilityId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }

    /// The owner's view of `capability` at `now`. `file_active` is false
    /// once the shared file has left the active state, even while the
    /// capability itself is still unexpired.
    pub fn link(&self, capability: &Capability, file_active: bool, now: DateTime<Utc>) -> ShareLink {
        let expires_at = capability.expires_at().instant();
        ShareLink {
            id: capability.id().clone(),
            file: capability.file().clone(),
            share_url: self.share_url(capability.id()),
            created_at: capability.created_at(),
            never_expires: expires_at.is_none(),
            expires_at,
            access_count: capability.access_count(),
            revoked: capability.is_revoked(),
            validity: capability.validate(now),
            file_active,
        }
    }
}

/// A capability together with its derived URL and current validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    /// Capability id
    pub id: CapabilityId,
    /// The shared file
    pub file: FileId,
    /// Where visitors open the link
    pub share_url: Url,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry instant, absent when the link never expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the link only ends by revocation
    pub never_expires: bool,
    /// Successful resolutions so far
    pub access_count: u64,
    /// Whether the owner revoked it
    pub revoked: bool,
    /// Validity of the capability alone at the time the view was built
    pub validity: Validity,
    /// Whether the shared file can still be served
    pub file_active: bool,
}
