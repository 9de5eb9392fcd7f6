use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, repo_types::User, services::load_user};
use crate::{error::AppError, state::AppState};

/// Verified caller identity taken from a Bearer access token.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        if !claims.is_access() {
            return Err(AppError::Unauthorized("Access token required".into()));
        }
        Ok(AuthUser(claims.sub))
    }
}

/// Authenticated caller resolved to a stored account.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        let user = load_user(state, user_id).await?.ok_or_else(|| {
            warn!(%user_id, "token subject no longer exists");
            AppError::Unauthorized("User not found".into())
        })?;
        Ok(CurrentUser(user))
    }
}

/// Admin authorization gate: 401 without an identity, 403 unless the identity
/// resolves to an account whose `is_admin` flag is set.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        match load_user(state, user_id).await? {
            Some(user) if user.is_admin => Ok(AdminUser(user)),
            _ => {
                warn!(%user_id, "admin operation refused");
                Err(AppError::Forbidden("Not authorized".into()))
            }
        }
    }
}
