//! Route authorization gate.
//!
//! Evaluated once per navigation, before a protected view mounts. Pure: the
//! decision depends only on the identity snapshot and the route's required
//! role.

use serde::Serialize;

use crate::models::user::{Role, User};
use crate::nav::required_role_for;

#[derive(Debug, Clone, PartialEq)]
pub enum IdentityState {
    /// The identity fetch has not resolved yet.
    Loading,
    /// `None` means the fetch resolved with no logged-in user.
    Resolved(Option<User>),
}

impl IdentityState {
    pub fn is_loading(&self) -> bool {
        matches!(self, IdentityState::Loading)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            IdentityState::Loading => None,
            IdentityState::Resolved(user) => user.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Pending,
    Render,
    RedirectLogin,
    RedirectUnauthorized,
}

impl Decision {
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            Decision::RedirectLogin => Some("/login"),
            Decision::RedirectUnauthorized => Some("/unauthorized"),
            Decision::Pending | Decision::Render => None,
        }
    }
}

pub fn authorize(user: Option<&User>, required_role: Option<Role>, loading: bool) -> Decision {
    if loading {
        return Decision::Pending;
    }

    let Some(user) = user.filter(|user| user.has_identity()) else {
        return Decision::RedirectLogin;
    };

    match required_role {
        Some(role) if role != user.role => Decision::RedirectUnauthorized,
        _ => Decision::Render,
    }
}

pub fn authorize_identity(identity: &IdentityState, required_role: Option<Role>) -> Decision {
    authorize(identity.user(), required_role, identity.is_loading())
}

/// Gate for a concrete dashboard path; public paths only need a resolved
/// identity.
pub fn authorize_route(identity: &IdentityState, path: &str) -> Decision {
    match required_role_for(path) {
        Some(role) => authorize_identity(identity, Some(role)),
        None if identity.is_loading() => Decision::Pending,
        None => Decision::Render,
    }
}
