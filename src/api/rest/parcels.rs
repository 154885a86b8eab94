use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::{respond, ApiResponse};
use crate::auth::identity::{require_role, CurrentUser};
use crate::error::AppError;
use crate::models::parcel::{Parcel, ParcelTracking};
use crate::models::user::Role;
use crate::state::AppState;
use crate::workflow::assign::assign_delivery_agent;
use crate::workflow::parcels::{
    create_parcel, find_parcel, offered_transitions, parcels_for, update_parcel_details,
    OfferedTransitions, ParcelDetails,
};
use crate::workflow::status::{apply_status_update, StatusUpdate};

const ADMINS: &[Role] = &[Role::Admin, Role::SuperAdmin];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcel/create-parcel", post(create))
        .route("/parcel/all-sender-parcel", get(sender_parcels))
        .route("/parcel/incoming", get(incoming_parcels))
        .route("/parcel/delivery-agent", get(agent_parcels))
        .route("/parcel/admin/all-parcels", get(all_parcels))
        .route("/parcel/single-parcel/:tracking_id", get(single_parcel))
        .route("/parcel/transitions/:tracking_id", get(transitions))
        .route("/parcel/status/:tracking_id", patch(update_status))
        .route(
            "/parcel/assign-delivery-agent/:tracking_id",
            patch(assign_agent),
        )
        .route("/parcel/:tracking_id", patch(update_details))
}

#[derive(Deserialize)]
pub struct AssignAgentRequest {
    pub delivery_agent: Uuid,
    #[serde(default)]
    pub note: Option<String>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ParcelDetails>,
) -> Result<Json<ApiResponse<Parcel>>, AppError> {
    require_role(&user, &[Role::Sender])?;
    let parcel = create_parcel(&state, &user, payload)?;
    Ok(respond("Parcel created successfully", parcel))
}

async fn sender_parcels(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Parcel>>>, AppError> {
    require_role(&user, &[Role::Sender])?;
    Ok(respond("Parcels retrieved", parcels_for(&state, &user)))
}

async fn incoming_parcels(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Parcel>>>, AppError> {
    require_role(&user, &[Role::Receiver])?;
    Ok(respond("Parcels retrieved", parcels_for(&state, &user)))
}

async fn agent_parcels(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Parcel>>>, AppError> {
    require_role(&user, &[Role::DeliveryAgent])?;
    Ok(respond("Parcels retrieved", parcels_for(&state, &user)))
}

async fn all_parcels(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<Parcel>>>, AppError> {
    require_role(&user, ADMINS)?;
    Ok(respond("Parcels retrieved", parcels_for(&state, &user)))
}

/// Public tracking lookup. Only the id-free tracking view is returned.
async fn single_parcel(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<Json<ApiResponse<ParcelTracking>>, AppError> {
    let parcel = find_parcel(&state, &tracking_id)?;
    Ok(respond("Parcel found", ParcelTracking::from(&parcel)))
}

async fn transitions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(tracking_id): Path<String>,
) -> Result<Json<ApiResponse<OfferedTransitions>>, AppError> {
    let offered = offered_transitions(&state, &user, &tracking_id)?;
    Ok(respond("Transitions retrieved", offered))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(tracking_id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<ApiResponse<Parcel>>, AppError> {
    let parcel = apply_status_update(&state, &user, &tracking_id, payload)?;
    Ok(respond("Status updated successfully", parcel))
}

async fn assign_agent(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(tracking_id): Path<String>,
    Json(payload): Json<AssignAgentRequest>,
) -> Result<Json<ApiResponse<Parcel>>, AppError> {
    require_role(&user, ADMINS)?;
    let parcel = assign_delivery_agent(
        &state,
        &user,
        &tracking_id,
        payload.delivery_agent,
        payload.note,
    )?;
    Ok(respond("Delivery agent assigned", parcel))
}

async fn update_details(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(tracking_id): Path<String>,
    Json(payload): Json<ParcelDetails>,
) -> Result<Json<ApiResponse<Parcel>>, AppError> {
    let parcel = update_parcel_details(&state, &user, &tracking_id, payload)?;
    Ok(respond("Parcel updated successfully", parcel))
}
