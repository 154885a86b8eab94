use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::flow::validator::offered_statuses;
use crate::models::parcel::{generate_tracking_id, Address, Parcel, ParcelStatus, TrackingEvent};
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::workflow::status::is_party;

const MIN_PHONE_LEN: usize = 11;
const MAX_PHONE_LEN: usize = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct ParcelDetails {
    pub parcel_type: String,
    pub weight_kg: f64,
    pub receiver_phone: String,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub delivery_date: DateTime<Utc>,
}

impl ParcelDetails {
    fn validate(&self) -> Result<(), AppError> {
        if self.parcel_type.trim().is_empty() {
            return Err(AppError::BadRequest("parcel type is required".to_string()));
        }

        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0) {
            return Err(AppError::BadRequest("weight must be positive".to_string()));
        }

        let phone_len = self.receiver_phone.trim().len();
        if !(MIN_PHONE_LEN..=MAX_PHONE_LEN).contains(&phone_len) {
            return Err(AppError::BadRequest(format!(
                "receiver phone must be {MIN_PHONE_LEN}-{MAX_PHONE_LEN} digits"
            )));
        }

        for (label, address) in [
            ("pickup", &self.pickup_address),
            ("delivery", &self.delivery_address),
        ] {
            if address.address.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{label} address is required")));
            }
        }

        Ok(())
    }
}

/// What a caller sees when deciding which status control to render.
#[derive(Debug, Clone, Serialize)]
pub struct OfferedTransitions {
    pub tracking_id: String,
    pub status: ParcelStatus,
    pub next: Vec<ParcelStatus>,
}

pub fn create_parcel(
    state: &AppState,
    sender: &User,
    details: ParcelDetails,
) -> Result<Parcel, AppError> {
    if sender.role != Role::Sender {
        return Err(AppError::Forbidden("only senders create parcels".to_string()));
    }
    details.validate()?;

    let receiver = resolve_receiver(state, &details.receiver_phone)?;
    let now = Utc::now();
    let tracking_id = generate_tracking_id(now);

    let parcel = Parcel {
        tracking_id: tracking_id.clone(),
        fee: state.fees.fee_for(details.weight_kg),
        parcel_type: details.parcel_type.trim().to_string(),
        weight_kg: details.weight_kg,
        receiver_phone: details.receiver_phone.trim().to_string(),
        pickup_address: details.pickup_address,
        delivery_address: details.delivery_address,
        delivery_date: details.delivery_date,
        status: ParcelStatus::Requested,
        sender: sender.id,
        receiver: receiver.id,
        delivery_agent: None,
        tracking_events: vec![TrackingEvent {
            status: ParcelStatus::Requested,
            note: "Parcel requested".to_string(),
            location: None,
            updated_by: sender.role,
            actor_id: sender.id,
            timestamp: now,
        }],
        created_at: now,
        updated_at: now,
    };

    state.parcels.insert(tracking_id.clone(), parcel.clone());
    state.metrics.parcels_created_total.inc();

    info!(
        tracking_id = %tracking_id,
        sender_id = %sender.id,
        receiver_id = %receiver.id,
        fee = parcel.fee,
        "parcel created"
    );

    Ok(parcel)
}

/// Sender edits while the parcel has not been handed to anyone yet.
pub fn update_parcel_details(
    state: &AppState,
    sender: &User,
    tracking_id: &str,
    details: ParcelDetails,
) -> Result<Parcel, AppError> {
    details.validate()?;
    let receiver = resolve_receiver(state, &details.receiver_phone)?;

    let mut parcel = state
        .parcels
        .get_mut(tracking_id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {tracking_id} not found")))?;

    if sender.role != Role::Sender || parcel.sender != sender.id {
        return Err(AppError::Forbidden(format!(
            "parcel {tracking_id} can only be edited by its sender"
        )));
    }

    if !parcel.status.is_editable() {
        return Err(AppError::Conflict(format!(
            "cannot update when status is {}",
            parcel.status
        )));
    }

    parcel.fee = state.fees.fee_for(details.weight_kg);
    parcel.parcel_type = details.parcel_type.trim().to_string();
    parcel.weight_kg = details.weight_kg;
    parcel.receiver_phone = details.receiver_phone.trim().to_string();
    parcel.receiver = receiver.id;
    parcel.pickup_address = details.pickup_address;
    parcel.delivery_address = details.delivery_address;
    parcel.delivery_date = details.delivery_date;
    parcel.updated_at = Utc::now();

    info!(tracking_id, "parcel details updated");
    Ok(parcel.clone())
}

pub fn find_parcel(state: &AppState, tracking_id: &str) -> Result<Parcel, AppError> {
    let tracking_id = tracking_id.trim();
    if tracking_id.is_empty() {
        return Err(AppError::BadRequest("tracking id is required".to_string()));
    }

    state
        .parcels
        .get(tracking_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("no parcel found for {tracking_id}")))
}

/// Parcels visible to `user`, newest first.
pub fn parcels_for(state: &AppState, user: &User) -> Vec<Parcel> {
    let mut parcels: Vec<Parcel> = state
        .parcels
        .iter()
        .filter(|entry| is_party(user, entry.value()))
        .map(|entry| entry.value().clone())
        .collect();

    parcels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    parcels
}

pub fn offered_transitions(
    state: &AppState,
    user: &User,
    tracking_id: &str,
) -> Result<OfferedTransitions, AppError> {
    let parcel = find_parcel(state, tracking_id)?;
    let next = if is_party(user, &parcel) {
        offered_statuses(parcel.status, user.role)
    } else {
        Vec::new()
    };

    Ok(OfferedTransitions {
        tracking_id: parcel.tracking_id,
        status: parcel.status,
        next,
    })
}

fn resolve_receiver(state: &AppState, phone: &str) -> Result<User, AppError> {
    state
        .find_receiver_by_phone(phone.trim())
        .ok_or_else(|| {
            AppError::BadRequest(format!("no receiver is registered with phone {}", phone.trim()))
        })
}
