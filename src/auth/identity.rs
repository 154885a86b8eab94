use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::token::bearer_token;
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

/// The caller, resolved from the `Authorization: Bearer` token issued at
/// login. Deleted accounts are unauthenticated; blocked accounts are refused.
pub struct CurrentUser(pub User);

/// Like [`CurrentUser`] but never rejects: anything that does not resolve is
/// treated as logged out. Used where the route gate makes the decision.
pub struct MaybeUser(pub Option<User>);

fn lookup(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(token) = bearer_token(&parts.headers) else {
        return Ok(None);
    };

    let claims = state.tokens.verify(token)?;
    let user = state
        .users
        .get(&claims.sub)
        .map(|entry| entry.value().clone())
        .filter(|user| !user.is_deleted)
        .ok_or(AppError::InvalidToken)?;

    Ok(Some(user))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = lookup(parts, state)?.ok_or(AppError::Unauthenticated)?;

        if user.is_blocked {
            return Err(AppError::Forbidden("account is blocked".to_string()));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(lookup(parts, state).ok().flatten()))
    }
}

pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }

    let names: Vec<&str> = allowed.iter().map(|role| role.as_str()).collect();
    Err(AppError::Forbidden(format!(
        "requires one of: {}",
        names.join(", ")
    )))
}
