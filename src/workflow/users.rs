use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::token::{hash_password, verify_password, Claims};
use crate::error::AppError;
use crate::models::user::{AgentProfile, Role, User};
use crate::state::AppState;
use crate::workflow::agents::has_active_parcels;

#[derive(Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub agent_profile: Option<AgentProfile>,
}

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

impl Registration {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().chars().count() < 2 {
            return Err(AppError::BadRequest(
                "name must be at least 2 characters".to_string(),
            ));
        }

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(AppError::BadRequest("invalid email address".to_string()));
        }

        if self.phone.trim().len() < 11 {
            return Err(AppError::BadRequest(
                "phone number must be at least 11 digits".to_string(),
            ));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.address.trim().chars().count() < 10 {
            return Err(AppError::BadRequest(
                "address must be at least 10 characters".to_string(),
            ));
        }

        if !self.role.is_self_registrable() {
            return Err(AppError::BadRequest(format!(
                "{} accounts cannot be self-registered",
                self.role
            )));
        }

        match (&self.role, &self.agent_profile) {
            (Role::DeliveryAgent, None) => Err(AppError::BadRequest(
                "delivery agents must provide vehicle and license details".to_string(),
            )),
            (Role::DeliveryAgent, Some(profile)) if profile.license_number.trim().len() < 5 => {
                Err(AppError::BadRequest(
                    "license number must be at least 5 characters".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

pub async fn register_user(
    state: &AppState,
    registration: Registration,
) -> Result<User, AppError> {
    registration.validate()?;

    let email = registration.email.trim().to_lowercase();
    let phone = registration.phone.trim().to_string();
    ensure_unique(state, &email, registration.role, &phone)?;

    let password_hash =
        hash_password(registration.password, state.tokens.bcrypt_cost()).await?;

    // Re-checked after hashing: another registration may have landed meanwhile.
    ensure_unique(state, &email, registration.role, &phone)?;

    let mut user = User::new(
        registration.name.trim().to_string(),
        email,
        phone,
        registration.address.trim().to_string(),
        registration.role,
    );
    user.password_hash = password_hash;
    if user.role == Role::DeliveryAgent {
        user.agent_profile = registration.agent_profile;
    }

    let user = state.insert_user(user);
    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

/// Parcels are bound to receivers by phone, so a receiver phone must name
/// exactly one account.
fn ensure_unique(state: &AppState, email: &str, role: Role, phone: &str) -> Result<(), AppError> {
    if state.find_user_by_email(email).is_some() {
        return Err(AppError::Conflict(format!("{email} is already registered")));
    }

    if role == Role::Receiver && state.receiver_phone_taken(phone) {
        return Err(AppError::Conflict(format!(
            "a receiver is already registered with phone {phone}"
        )));
    }

    Ok(())
}

pub async fn login(state: &AppState, credentials: Credentials) -> Result<LoginOutcome, AppError> {
    let email = credentials.email.trim().to_lowercase();
    let user = state
        .find_user_by_email(&email)
        .filter(|user| !user.is_deleted && !user.password_hash.is_empty())
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(credentials.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login refused: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    if user.is_blocked {
        return Err(AppError::Forbidden("account is blocked".to_string()));
    }

    let access_token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, role = %user.role, "user logged in");

    Ok(LoginOutcome {
        access_token,
        token_type: "Bearer",
        user,
    })
}

/// Revokes the presented token. Other tokens of the same user stay valid.
pub fn logout(state: &AppState, token: &str) -> Result<(), AppError> {
    let claims: Claims = state.tokens.verify(token)?;
    state.tokens.revoke(&claims);
    info!(user_id = %claims.sub, "user logged out");
    Ok(())
}

pub fn list_users(state: &AppState, role: Option<Role>) -> Vec<User> {
    let mut users: Vec<User> = state
        .users
        .iter()
        .filter(|entry| role.is_none_or(|role| entry.role == role))
        .map(|entry| entry.value().clone())
        .collect();

    users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    users
}

/// Admin block toggle. Admin accounts are never blocked through this path.
pub fn toggle_block(state: &AppState, actor: &User, user_id: Uuid) -> Result<User, AppError> {
    ensure_admin(actor)?;

    let mut user = state
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    if user.role.is_admin() {
        return Err(AppError::Forbidden("admins cannot be blocked".to_string()));
    }

    user.is_blocked = !user.is_blocked;
    let updated = user.clone();
    drop(user);
    state.refresh_agent_gauge();

    info!(user_id = %user_id, blocked = updated.is_blocked, "user block toggled");
    Ok(updated)
}

/// Soft delete. Agents still carrying parcels must hand them back first.
pub fn soft_delete(state: &AppState, actor: &User, user_id: Uuid) -> Result<User, AppError> {
    ensure_admin(actor)?;

    if has_active_parcels(state, user_id) {
        return Err(AppError::Conflict(
            "delivery agent still has active parcels".to_string(),
        ));
    }

    let mut user = state
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    if user.role.is_admin() {
        return Err(AppError::Forbidden("admins cannot be deleted".to_string()));
    }

    user.is_deleted = true;
    let updated = user.clone();
    drop(user);
    state.refresh_agent_gauge();

    info!(user_id = %user_id, "user soft-deleted");
    Ok(updated)
}

fn ensure_admin(actor: &User) -> Result<(), AppError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("admin role required".to_string()))
    }
}
