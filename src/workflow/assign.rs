use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::flow::validator::check_transition;
use crate::models::parcel::{Parcel, ParcelStatus, TrackingEvent};
use crate::models::user::{AvailableStatus, User};
use crate::state::AppState;
use crate::workflow::agents::agent_slot_key;
use crate::workflow::guard::InFlight;
use crate::workflow::status::outcome_of;

/// Hands an APPROVED or PENDING parcel to an available agent and moves it to
/// ASSIGNED. The agent becomes BUSY.
pub fn assign_delivery_agent(
    state: &AppState,
    actor: &User,
    tracking_id: &str,
    agent_id: Uuid,
    note: Option<String>,
) -> Result<Parcel, AppError> {
    let start = Instant::now();
    let result = assign(state, actor, tracking_id, agent_id, note);

    state
        .metrics
        .record_status_update(outcome_of(&result), start.elapsed().as_secs_f64());

    match &result {
        Ok(_) => info!(tracking_id, agent_id = %agent_id, "delivery agent assigned"),
        Err(err) => warn!(
            tracking_id,
            agent_id = %agent_id,
            actor_id = %actor.id,
            error = %err,
            "delivery agent assignment refused"
        ),
    }

    result
}

fn assign(
    state: &AppState,
    actor: &User,
    tracking_id: &str,
    agent_id: Uuid,
    note: Option<String>,
) -> Result<Parcel, AppError> {
    if !actor.role.is_admin() {
        return Err(AppError::Forbidden(
            "only admins assign delivery agents".to_string(),
        ));
    }

    let (agent, _agent_slot) = reserve_agent(state, agent_id)?;
    let attached = attach_agent(state, actor, tracking_id, &agent, note);
    if attached.is_err() {
        return_agent(state, agent_id);
    }
    state.refresh_agent_gauge();

    attached
}

/// Claims an AVAILABLE agent by flipping it to BUSY under the agent's own
/// entry lock, so two assignments can never both see it free. The returned
/// slot stops `release_agent` from undoing the claim before the parcel
/// records the agent.
fn reserve_agent(state: &AppState, agent_id: Uuid) -> Result<(User, InFlight), AppError> {
    let mut agent = state
        .users
        .get_mut(&agent_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery agent {agent_id} not found")))?;

    if !agent.is_available_agent() {
        return Err(AppError::Conflict(format!(
            "{} is not an available delivery agent",
            agent.name
        )));
    }

    let slot = state
        .in_flight
        .try_acquire(&agent_slot_key(agent_id))
        .ok_or_else(|| {
            AppError::Conflict(format!("{} is already being assigned", agent.name))
        })?;

    agent.available_status = Some(AvailableStatus::Busy);
    Ok((agent.clone(), slot))
}

/// Undoes a reservation whose parcel could not take the agent. Nothing else
/// can have claimed a BUSY agent in between.
fn return_agent(state: &AppState, agent_id: Uuid) {
    if let Some(mut agent) = state.users.get_mut(&agent_id) {
        if agent.available_status == Some(AvailableStatus::Busy) {
            agent.available_status = Some(AvailableStatus::Available);
        }
    }
}

fn attach_agent(
    state: &AppState,
    actor: &User,
    tracking_id: &str,
    agent: &User,
    note: Option<String>,
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

    check_transition(parcel.status, ParcelStatus::Assigned, actor.role)?;

    parcel.delivery_agent = Some(agent.id);
    let event = TrackingEvent {
        status: ParcelStatus::Assigned,
        note: note
            .filter(|note| !note.trim().is_empty())
            .unwrap_or_else(|| format!("Assigned to {}", agent.name)),
        location: None,
        updated_by: actor.role,
        actor_id: actor.id,
        timestamp: Utc::now(),
    };
    parcel.record(event.clone());
    let updated = parcel.clone();
    drop(parcel);

    state.publish(tracking_id, &event);
    Ok(updated)
}
