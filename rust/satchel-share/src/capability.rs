//! Share capabilities and their validity rules.

use chrono::{DateTime, Duration, Utc};
use satchel_storage::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CapabilityId, FileId, UserId};

/// Lifetimes a share link may be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ShareDuration {
    /// One day
    Day,
    /// Seven days
    Week,
    /// Thirty days
    Month,
}

impl ShareDuration {
    /// Every allowed duration, shortest first
    pub const ALL: [ShareDuration; 3] = [ShareDuration::Day, ShareDuration::Week, ShareDuration::Month];

    /// Length in days
    pub fn days(self) -> u32 {
        match self {
            ShareDuration::Day => 1,
            ShareDuration::Week => 7,
            ShareDuration::Month => 30,
        }
    }

    /// Length as a [Duration]
    pub fn as_duration(self) -> Duration {
        Duration::days(self.days() as i64)
    }
}

/// A day count outside the allowed set
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unsupported share duration of {0} days (allowed: 1, 7 or 30)")]
pub struct UnsupportedDuration(pub u32);

impl TryFrom<u32> for ShareDuration {
    type Error = UnsupportedDuration;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        ShareDuration::ALL
            .into_iter()
            .find(|duration| duration.days() == days)
            .ok_or(UnsupportedDuration(days))
    }
}

impl From<ShareDuration> for u32 {
    fn from(duration: ShareDuration) -> Self {
        duration.days()
    }
}

/// When a capability stops granting access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Valid until revoked
    Never,
    /// Valid strictly before this instant
    At(DateTime<Utc>),
}

impl Expiry {
    /// The expiry of a capability created at `now` for `duration`
    pub fn after(now: DateTime<Utc>, duration: Option<ShareDuration>) -> Self {
        match duration {
            Some(duration) => Expiry::At(now + duration.as_duration()),
            None => Expiry::Never,
        }
    }

    /// The expiry instant, if any
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(*at),
        }
    }

    /// Time left at `now`; `None` for [Expiry::Never]. Negative once passed.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.instant().map(|at| at - now)
    }
}

/// Outcome of validating a capability at some instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// Grants access
    Active,
    /// Past its expiry
    Expired,
    /// Withdrawn by its owner
    Revoked,
}

/// Whole seconds until `expiry`, for stores that can drop records on their
/// own. `None` when the capability never expires or already has.
pub fn retention_hint(expiry: &Expiry, now: DateTime<Utc>) -> Option<u64> {
    expiry
        .remaining(now)
        .map(|remaining| remaining.num_seconds())
        .filter(|seconds| *seconds > 0)
        .map(|seconds| seconds as u64)
}

/// An unguessable, revocable grant of read access to one file.
///
/// The id, file and owner are fixed at creation. `revoked` can only go from
/// false to true and `access_count` only grows; the fields are private so
/// that only [Capability::revoke] and [Capability::record_access] change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    id: CapabilityId,
    file: FileId,
    owner: UserId,
    expires_at: Expiry,
    access_count: u64,
    created_at: DateTime<Utc>,
    revoked: bool,
    #[serde(default)]
    revoked_at: Option<DateTime<Utc>>,
    retention_hint: Option<u64>,
}

impl Capability {
    /// A fresh capability for `file`, owned by `owner`
    pub fn issue(
        id: CapabilityId,
        file: FileId,
        owner: UserId,
        duration: Option<ShareDuration>,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = Expiry::after(now, duration);
        Self {
            id,
            file,
            owner,
            retention_hint: retention_hint(&expires_at, now),
            expires_at,
            access_count: 0,
            created_at: now,
            revoked: false,
            revoked_at: None,
        }
    }

    /// Validity at `now`. Revocation is reported ahead of expiry.
    ///
    /// This only looks at the capability itself; whether its file is still
    /// active is checked separately.
    pub fn validate(&self, now: DateTime<Utc>) -> Validity {
        if self.revoked {
            return Validity::Revoked;
        }
        match self.expires_at {
            Expiry::At(at) if now >= at => Validity::Expired,
            _ => Validity::Active,
        }
    }

    /// Shorthand for `validate(now) == Validity::Active`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.validate(now) == Validity::Active
    }

    /// Revoke at `now`. Returns whether anything changed; revoking again
    /// keeps the first timestamp.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        self.revoked_at = Some(now);
        true
    }

    /// Count one successful resolution
    pub fn record_access(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Identifier
    pub fn id(&self) -> &CapabilityId {
        &self.id
    }

    /// The shared file
    pub fn file(&self) -> &FileId {
        &self.file
    }

    /// Owner at creation time
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Expiry
    pub fn expires_at(&self) -> Expiry {
        self.expires_at
    }

    /// Successful resolutions so far
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the owner revoked it
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// When it was revoked, for records written since that was tracked
    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    /// Advisory store TTL in seconds, computed at creation
    pub fn retention_hint(&self) -> Option<u64> {
        self.retention_hint
    }
}

impl Document for Capability {
    const COLLECTION: &'static str = "shares";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}
