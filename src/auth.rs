use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::models::{Actor, Role};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Sessions are issued upstream. This only checks the shared bearer token
/// and reads the identity the upstream layer forwarded.
pub fn authenticate(headers: &HeaderMap, expected_token: &str) -> Result<Actor, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }

    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let role = match headers.get(USER_ROLE_HEADER) {
        None => Role::Staff,
        Some(v) => v
            .to_str()
            .ok()
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?,
    };

    Ok(Actor { user_id, role })
}

pub fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.role != Role::Admin {
        tracing::warn!(user_id = ?actor.user_id, role = actor.role.as_str(), "admin action refused");
        return Err(AppError::Forbidden("admin role required".to_string()));
    }
    Ok(())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, &state.config.api_token)
    }
}
