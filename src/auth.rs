//! Bearer-token session extractors
//!
//! Clients receive a session token from sign-up or sign-in and send it back
//! as `Authorization: Bearer <token>`. Handlers ask for [`AuthUser`] or
//! [`AdminUser`] to require a session.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::error::GameError;
use crate::state::AppState;
use crate::types::{User, UserRole};

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Raw session token of the request
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = GameError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .map(|t| SessionToken(t.to_string()))
            .ok_or(GameError::Unauthenticated)
    }
}

/// Any signed-in user
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = GameError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(GameError::Unauthenticated)?;
        let user = state
            .user_for_token(token)
            .await
            .ok_or(GameError::Unauthenticated)?;
        Ok(AuthUser(user))
    }
}

/// Signed-in user with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = GameError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            tracing::warn!(user_id = %user.id, "Admin route requested by non-admin");
            return Err(GameError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
