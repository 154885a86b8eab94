use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::auth::gate::{authorize_identity, authorize_route, Decision, IdentityState};
use crate::models::user::{Role, User};
use crate::nav::{sidebar_for, NavSection};

/// The `GET current-user` collaborator.
pub trait IdentitySource {
    type Error: Display;

    fn fetch_current_user(&self) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;
}

/// Immutable identity snapshot shared by every component that needs the
/// current user. A refresh produces a new snapshot; existing clones keep
/// seeing the old one.
#[derive(Debug, Clone)]
pub struct Session {
    identity: Arc<IdentityState>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn loading() -> Self {
        Self {
            identity: Arc::new(IdentityState::Loading),
            fetched_at: None,
        }
    }

    pub fn resolved(user: Option<User>) -> Self {
        Self {
            identity: Arc::new(IdentityState::Resolved(user)),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Re-fetch the identity. A failed fetch resolves as logged out.
    pub async fn fetch<S>(source: &S) -> Self
    where
        S: IdentitySource,
    {
        match source.fetch_current_user().await {
            Ok(user) => {
                debug!(
                    role = user.as_ref().map(|u| u.role.as_str()),
                    "session refreshed"
                );
                Self::resolved(user)
            }
            Err(err) => {
                warn!(error = %err, "identity fetch failed; treating as logged out");
                Self::resolved(None)
            }
        }
    }

    pub fn identity(&self) -> &IdentityState {
        &self.identity
    }

    pub fn user(&self) -> Option<&User> {
        self.identity.user()
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| user.role)
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn authorize(&self, required_role: Option<Role>) -> Decision {
        authorize_identity(&self.identity, required_role)
    }

    pub fn authorize_route(&self, path: &str) -> Decision {
        authorize_route(&self.identity, path)
    }

    pub fn sidebar(&self) -> &'static [NavSection] {
        self.role().map(sidebar_for).unwrap_or(&[])
    }
}
