use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::flow::validator::check_transition;
use crate::models::parcel::{GeoPoint, Parcel, ParcelStatus, TrackingEvent};
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::workflow::agents::release_agent;

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: ParcelStatus,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Status the caller last saw. When present and stale the update is
    /// refused instead of being applied to a parcel that has moved on.
    #[serde(default)]
    pub expected_status: Option<ParcelStatus>,
}

/// Whether `actor` is one of the parties allowed to touch `parcel` at all.
pub fn is_party(actor: &User, parcel: &Parcel) -> bool {
    match actor.role {
        Role::Admin | Role::SuperAdmin => true,
        Role::Sender => parcel.sender == actor.id,
        Role::Receiver => parcel.receiver == actor.id,
        Role::DeliveryAgent => parcel.delivery_agent == Some(actor.id),
    }
}

/// Metric label for the result of a status-changing request.
pub(crate) fn outcome_of<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "applied",
        Err(AppError::InvalidTransition(_) | AppError::Forbidden(_) | AppError::BadRequest(_)) => {
            "rejected"
        }
        Err(AppError::Conflict(_)) => "conflict",
        Err(_) => "error",
    }
}

pub fn apply_status_update(
    state: &AppState,
    actor: &User,
    tracking_id: &str,
    update: StatusUpdate,
) -> Result<Parcel, AppError> {
    let start = Instant::now();
    let result = transition_parcel(state, actor, tracking_id, update);

    state
        .metrics
        .record_status_update(outcome_of(&result), start.elapsed().as_secs_f64());

    if let Err(err) = &result {
        warn!(
            tracking_id,
            actor_id = %actor.id,
            role = %actor.role,
            error = %err,
            "status update refused"
        );
    }

    result
}

fn transition_parcel(
    state: &AppState,
    actor: &User,
    tracking_id: &str,
    update: StatusUpdate,
) -> Result<Parcel, AppError> {
    let _slot = state.in_flight.try_acquire(tracking_id).ok_or_else(|| {
        AppError::Conflict(format!(
            "a status update for {tracking_id} is already in progress"
        ))
    })?;

    let mut parcel = state
        .parcels
        .get_mut(tracking_id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {tracking_id} not found")))?;

    if let Some(expected) = update.expected_status {
        if expected != parcel.status {
            return Err(AppError::Conflict(format!(
                "parcel {tracking_id} is now {}, not {expected}",
                parcel.status
            )));
        }
    }

    if !is_party(actor, &parcel) {
        return Err(AppError::Forbidden(format!(
            "parcel {tracking_id} does not belong to this {}",
            actor.role
        )));
    }

    let from = parcel.status;
    check_transition(from, update.status, actor.role)?;

    if update.status == ParcelStatus::Assigned && parcel.delivery_agent.is_none() {
        return Err(AppError::BadRequest(
            "assign a delivery agent before marking the parcel ASSIGNED".to_string(),
        ));
    }

    let carrying_agent = parcel.delivery_agent;
    if from == ParcelStatus::Returned && update.status == ParcelStatus::Requested {
        parcel.delivery_agent = None;
    }

    let event = TrackingEvent {
        status: update.status,
        note: update
            .note
            .filter(|note| !note.trim().is_empty())
            .unwrap_or_else(|| format!("Status changed from {from} to {}", update.status)),
        location: update.location,
        updated_by: actor.role,
        actor_id: actor.id,
        timestamp: Utc::now(),
    };
    parcel.record(event.clone());
    let updated = parcel.clone();
    drop(parcel);

    if let Some(agent_id) = carrying_agent {
        if !updated.status.occupies_agent() {
            release_agent(state, agent_id);
        }
    }

    state.publish(tracking_id, &event);

    info!(
        tracking_id,
        from = %from,
        to = %updated.status,
        role = %actor.role,
        "parcel status updated"
    );

    Ok(updated)
}
