//! Read-only credential minting.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use satchel_common::Clock;
use serde::Serialize;
use url::Url;

use crate::{AccessError, Credentials, MAX_EXPIRES, Request};

/// How the storage service should present the object to whoever follows the
/// URL. Both values become signed `response-*` overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    /// Value for the `Content-Type` response header.
    pub content_type: Option<String>,
    /// File name offered in `Content-Disposition`.
    pub file_name: Option<String>,
}

/// A signed, read-only URL for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadCredential {
    /// Presigned GET URL.
    pub url: Url,
    /// When the URL stops working.
    pub expires_at: DateTime<Utc>,
    /// Granted lifetime in seconds.
    pub lifetime: u64,
}

/// Issues [`ReadCredential`]s, never for longer than the platform ceiling.
#[derive(Debug, Clone)]
pub struct Minter {
    credentials: Credentials,
    ceiling: Duration,
    clock: Arc<dyn Clock>,
}

impl Minter {
    /// A minter whose ceiling is the S3 maximum of seven days.
    pub fn new(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials,
            ceiling: Duration::seconds(MAX_EXPIRES as i64),
            clock,
        }
    }

    /// Lower the ceiling. Values above the S3 maximum are clamped to it and
    /// values below one second are raised to one second.
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling.clamp(
            Duration::seconds(1),
            Duration::seconds(MAX_EXPIRES as i64),
        );
        self
    }

    /// The longest lifetime this minter will grant.
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// The signing credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The clock used as signing time.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Lifetime actually granted for a request of `requested`:
    /// `min(requested, ceiling)` in whole seconds.
    pub fn granted(&self, requested: Duration) -> Result<Duration, AccessError> {
        let granted = requested.min(self.ceiling);
        if granted.num_seconds() <= 0 {
            return Err(AccessError::InvalidLifetime(requested.num_seconds()));
        }
        Ok(Duration::seconds(granted.num_seconds()))
    }

    /// Presign a GET for `key` valid from now for at most `requested`.
    pub fn mint(
        &self,
        key: &str,
        requested: Duration,
        presentation: &Presentation,
    ) -> Result<ReadCredential, AccessError> {
        let lifetime = self.granted(requested)?.num_seconds() as u64;
        let mut request = Request::get(key, self.clock.now()).with_expires(lifetime);

        if let Some(content_type) = &presentation.content_type {
            request = request.with_param("response-content-type", content_type);
        }
        if let Some(file_name) = &presentation.file_name {
            request = request.with_param(
                "response-content-disposition",
                format!("inline; filename=\"{}\"", file_name.replace(&['"', '\\'][..], "_")),
            );
        }

        let authorization = self.credentials.authorize(&request)?;

        Ok(ReadCredential {
            url: authorization.url,
            expires_at: authorization.expires_at,
            lifetime,
        })
    }
}
