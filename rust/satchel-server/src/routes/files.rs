use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
};
use chrono::{DateTime, Utc};
use satchel_share::{DeletionReport, FileId, FileRecord, FileStatus};
use serde::{Deserialize, Serialize};

use crate::{auth::Caller, error::ServerError, state::AppState};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file as shown to its owner. Storage coordinates are left out.
#[derive(Debug, Serialize)]
pub struct FileView {
    pub id: FileId,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub status: FileStatus,
    pub uploaded_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<FileRecord> for FileView {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            content_type: record.content_type,
            size: record.size,
            status: record.status,
            uploaded_at: record.uploaded_at,
            deleted_at: record.deleted_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: String,
}

/// The request body is the file itself; its name travels in `?name=`.
pub async fn upload(
    State(state): State<AppState>,
    Caller(caller): Caller,
    params: Result<Query<UploadParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<FileView>), ServerError> {
    let Query(params) = params?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let record = state
        .library
        .upload(&caller, &params.name, content_type, body.to_vec())
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn list(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<FileView>>, ServerError> {
    let files = state.library.list(&caller).await?;
    Ok(Json(files.into_iter().map(FileView::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<FileId>,
) -> Result<Json<FileView>, ServerError> {
    Ok(Json(state.library.get(&caller, &id).await?.into()))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

pub async fn rename(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<FileId>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<FileView>, ServerError> {
    let Json(payload) = payload?;
    let record = state.library.rename(&caller, &id, &payload.name).await?;
    Ok(Json(record.into()))
}

/// Soft delete. Shares of a trashed file stop resolving but are kept.
pub async fn trash(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<FileId>,
) -> Result<Json<FileView>, ServerError> {
    Ok(Json(state.library.trash(&caller, &id).await?.into()))
}

/// Permanent delete, taking the file's shares with it.
pub async fn delete(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<FileId>,
) -> Result<Json<DeletionReport>, ServerError> {
    Ok(Json(state.library.delete(&caller, &id).await?))
}
