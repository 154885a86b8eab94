use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, patch, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::{respond, ApiResponse};
use crate::auth::gate::{authorize_route, Decision, IdentityState};
use crate::auth::identity::{require_role, CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::models::parcel::GeoPoint;
use crate::models::user::{AvailableStatus, Role, User};
use crate::nav::{default_route, sidebar_for, NavSection};
use crate::state::AppState;
use crate::workflow::agents::set_availability;
use crate::workflow::users::{list_users, register_user, soft_delete, toggle_block, Registration};

const ADMINS: &[Role] = &[Role::Admin, Role::SuperAdmin];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/get-me", get(get_me))
        .route("/user/all-user", get(all_users))
        .route("/user/available-status", patch(update_availability))
        .route("/user/block/:id", patch(block_user))
        .route("/user/sidebar", get(sidebar))
        .route("/user/authorize", get(authorize))
        .route("/user/:id", delete(delete_user))
}

#[derive(Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub available_status: AvailableStatus,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Deserialize)]
pub struct AuthorizeQuery {
    pub route: String,
}

#[derive(Serialize)]
pub struct SidebarResponse {
    pub role: Role,
    pub default_route: Option<&'static str>,
    pub sections: &'static [NavSection],
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub route: String,
    pub decision: Decision,
    pub redirect: Option<&'static str>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Registration>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = register_user(&state, payload).await?;
    Ok(respond("Registration successful", user))
}

async fn get_me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<User>> {
    respond("User retrieved", user)
}

async fn all_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<UserFilter>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    require_role(&user, ADMINS)?;
    Ok(respond("Users retrieved", list_users(&state, filter.role)))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let updated = set_availability(&state, &user, payload.available_status, payload.location)?;
    Ok(respond("Available status updated successfully", updated))
}

async fn block_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let updated = toggle_block(&state, &user, id)?;
    let message = if updated.is_blocked {
        "User blocked successfully"
    } else {
        "User unblocked successfully"
    };
    Ok(respond(message, updated))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let updated = soft_delete(&state, &user, id)?;
    Ok(respond("User deleted successfully", updated))
}

async fn sidebar(CurrentUser(user): CurrentUser) -> Json<ApiResponse<SidebarResponse>> {
    respond(
        "Sidebar retrieved",
        SidebarResponse {
            role: user.role,
            default_route: default_route(user.role),
            sections: sidebar_for(user.role),
        },
    )
}

/// Server-side evaluation of the route gate, for callers that cannot embed
/// the library. The identity is always resolved here, so it never answers
/// PENDING.
async fn authorize(
    MaybeUser(user): MaybeUser,
    Query(query): Query<AuthorizeQuery>,
) -> Json<ApiResponse<AuthorizeResponse>> {
    let identity = IdentityState::Resolved(user);
    let decision = authorize_route(&identity, &query.route);

    respond(
        "Route authorized",
        AuthorizeResponse {
            route: query.route,
            decision,
            redirect: decision.redirect_path(),
        },
    )
}
