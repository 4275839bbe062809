//! Bearer tokens for logged-in users.
//!
//! A token is `<user id>.<hex HMAC-SHA256 of the user id>`. Holding one is
//! the whole of being logged in: the server keeps no sessions.

use axum::{extract::FromRequestParts, http::request::Parts};
use hmac::{Hmac, Mac};
use satchel_share::UserId;
use sha2::Sha256;
use thiserror::Error;

use crate::{error::ServerError, state::AppState};

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
}

/// Issues and checks bearer tokens with a server-side secret.
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC-SHA256 accepts keys of any size")
    }

    pub fn issue(&self, user: &UserId) -> String {
        let mut mac = self.mac();
        mac.update(user.as_str().as_bytes());
        format!("{}.{}", user, hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let (user, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        if user.is_empty() {
            return Err(TokenError::Malformed);
        }
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(user.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        Ok(UserId::new(user))
    }
}

/// The logged-in user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ServerError::Unauthenticated)?;

        let user = state.tokens.verify(token.trim()).map_err(|error| {
            tracing::debug!(%error, "Rejected bearer token");
            ServerError::Unauthenticated
        })?;

        Ok(Caller(user))
    }
}
