//! Anonymous share link resolution.
//!
//! The capability id in the path is the only credential. Owner-only details
//! (access count, owner, storage key) are never part of the response.

use axum::{
    Json,
    extract::{Path, State},
    response::Redirect,
};
use chrono::{DateTime, Utc};
use satchel_share::{CapabilityId, FileMetadata};
use serde::Serialize;
use url::Url;

use crate::{error::ServerError, state::AppState};

#[derive(Debug, Serialize)]
pub struct ResolvedShare {
    pub file: FileMetadata,
    pub download_url: Url,
    pub download_expires_at: DateTime<Utc>,
    /// Seconds the download URL stays valid
    pub lifetime: u64,
}

pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<CapabilityId>,
) -> Result<Json<ResolvedShare>, ServerError> {
    let resolution = state.resolver.resolve(&id).await?;

    Ok(Json(ResolvedShare {
        file: resolution.file,
        download_url: resolution.credential.url,
        download_expires_at: resolution.credential.expires_at,
        lifetime: resolution.credential.lifetime,
    }))
}

/// Resolve and send the visitor straight to the bytes.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<CapabilityId>,
) -> Result<Redirect, ServerError> {
    let resolution = state.resolver.resolve(&id).await?;
    Ok(Redirect::temporary(resolution.credential.url.as_str()))
}
