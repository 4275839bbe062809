use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use satchel_share::ShareError;
use serde_json::json;
use thiserror::Error;

/// Seconds a client is asked to wait after a transient backend failure.
pub const RETRY_AFTER_SECONDS: u64 = 5;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("missing or invalid bearer token")]
    Unauthenticated,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Share(#[from] ShareError),
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl ServerError {
    /// Status code and stable machine-readable kind.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ServerError::Share(error) => match error {
                ShareError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ShareError::Unauthorized(_) => (StatusCode::FORBIDDEN, "forbidden"),
                ShareError::Expired => (StatusCode::GONE, "expired"),
                ShareError::Revoked => (StatusCode::GONE, "revoked"),
                ShareError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
                ShareError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
                ShareError::MintingFailed(_) => (StatusCode::BAD_GATEWAY, "minting_failed"),
                ShareError::Infrastructure {
                    retryable: true, ..
                } => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
                ShareError::Infrastructure { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();

        // Backend details stay in the logs
        let message = match &self {
            ServerError::Share(
                error @ (ShareError::MintingFailed(_) | ShareError::Infrastructure { .. }),
            ) => {
                tracing::error!(%error, "Request failed");
                status
                    .canonical_reason()
                    .unwrap_or("server error")
                    .to_lowercase()
            }
            other => other.to_string(),
        };

        let mut response =
            (status, Json(json!({ "error": kind, "message": message }))).into_response();

        match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECONDS));
            }
            StatusCode::UNAUTHORIZED => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            _ => {}
        }

        response
    }
}
