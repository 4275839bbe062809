use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use satchel_share::{Capability, CapabilityId, FileId, ShareDuration, ShareError, ShareLink};
use serde::Deserialize;

use crate::{auth::Caller, error::ServerError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    pub file: FileId,
    /// 1, 7 or 30; absent or null for a link that never expires
    #[serde(default)]
    pub duration_days: Option<u32>,
}

pub async fn create(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShareLink>), ServerError> {
    let Json(payload) = payload?;
    let duration = payload
        .duration_days
        .map(ShareDuration::try_from)
        .transpose()
        .map_err(|error| ShareError::InvalidRequest(error.to_string()))?;

    let capability = state
        .lifecycle
        .create(&caller, &payload.file, duration)
        .await?;

    let link = state
        .links
        .link(&capability, true, state.handles.clock.now());
    Ok((StatusCode::CREATED, Json(link)))
}

async fn present(
    state: &AppState,
    capabilities: Vec<Capability>,
) -> Result<Vec<ShareLink>, ServerError> {
    let now = state.handles.clock.now();
    let files = state.lifecycle.file_states(&capabilities).await?;
    Ok(capabilities
        .iter()
        .map(|capability| {
            let file_active = files.get(capability.file()).copied().unwrap_or(false);
            state.links.link(capability, file_active, now)
        })
        .collect())
}

pub async fn list(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<ShareLink>>, ServerError> {
    let shares = state.lifecycle.list_by_owner(&caller).await?;
    Ok(Json(present(&state, shares).await?))
}

pub async fn list_for_file(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(file): Path<FileId>,
) -> Result<Json<Vec<ShareLink>>, ServerError> {
    let shares = state.lifecycle.list_by_file(&caller, &file).await?;
    Ok(Json(present(&state, shares).await?))
}

/// Revoking twice is not an error; the response shows the revoked link.
pub async fn revoke(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<CapabilityId>,
) -> Result<Json<ShareLink>, ServerError> {
    let capability = state.lifecycle.revoke(&caller, &id).await?;
    let files = state
        .lifecycle
        .file_states(std::slice::from_ref(&capability))
        .await?;
    let file_active = files.get(capability.file()).copied().unwrap_or(false);
    Ok(Json(state.links.link(
        &capability,
        file_active,
        state.handles.clock.now(),
    )))
}
