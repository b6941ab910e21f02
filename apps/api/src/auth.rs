use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::models::user::UserId;
use crate::state::AppState;

/// Resolves a session token to the signed-in user.
/// Carried in `AppState` as `Arc<dyn SessionVerifier>`.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// `Ok(None)` for unknown, expired or revoked sessions.
    async fn verify(&self, session_token: &str) -> Result<Option<UserId>, AppError>;
}

/// The caller's identity, taken from the `Authorization: Bearer` session token.
/// Handlers never read a user id from the request body.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        state
            .sessions
            .verify(token)
            .await?
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}
