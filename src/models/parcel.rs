use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParcelStatus {
    Requested,
    Approved,
    Pending,
    Assigned,
    #[serde(rename = "PICKEDUP")]
    PickedUp,
    OnTheWay,
    Delivered,
    Confirmed,
    Returned,
    Cancelled,
    Blocked,
}

impl ParcelStatus {
    pub const ALL: [ParcelStatus; 11] = [
        ParcelStatus::Requested,
        ParcelStatus::Approved,
        ParcelStatus::Pending,
        ParcelStatus::Assigned,
        ParcelStatus::PickedUp,
        ParcelStatus::OnTheWay,
        ParcelStatus::Delivered,
        ParcelStatus::Confirmed,
        ParcelStatus::Returned,
        ParcelStatus::Cancelled,
        ParcelStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::Requested => "REQUESTED",
            ParcelStatus::Approved => "APPROVED",
            ParcelStatus::Pending => "PENDING",
            ParcelStatus::Assigned => "ASSIGNED",
            ParcelStatus::PickedUp => "PICKEDUP",
            ParcelStatus::OnTheWay => "ON_THE_WAY",
            ParcelStatus::Delivered => "DELIVERED",
            ParcelStatus::Confirmed => "CONFIRMED",
            ParcelStatus::Returned => "RETURNED",
            ParcelStatus::Cancelled => "CANCELLED",
            ParcelStatus::Blocked => "BLOCKED",
        }
    }

    /// Statuses in which an assigned agent is still carrying the parcel.
    pub fn occupies_agent(&self) -> bool {
        matches!(
            self,
            ParcelStatus::Assigned | ParcelStatus::PickedUp | ParcelStatus::OnTheWay
        )
    }

    /// Statuses in which the sender may still edit parcel details.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            ParcelStatus::Requested | ParcelStatus::Approved | ParcelStatus::Cancelled
        )
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParcelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParcelStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown parcel status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingEvent {
    pub status: ParcelStatus,
    pub note: String,
    pub location: Option<GeoPoint>,
    pub updated_by: Role,
    pub actor_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parcel {
    pub tracking_id: String,
    pub parcel_type: String,
    pub weight_kg: f64,
    pub fee: f64,
    pub receiver_phone: String,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub delivery_date: DateTime<Utc>,
    pub status: ParcelStatus,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub delivery_agent: Option<Uuid>,
    pub tracking_events: Vec<TrackingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Parcel {
    pub fn current_event(&self) -> Option<&TrackingEvent> {
        self.tracking_events.last()
    }

    /// Moves the parcel to `status` and appends the matching tracking event.
    /// Callers are expected to have validated the transition already.
    pub fn record(&mut self, event: TrackingEvent) {
        self.status = event.status;
        self.updated_at = event.timestamp;
        self.tracking_events.push(event);
    }
}

/// A tracking event as shown to anyone holding the tracking id: who acted is
/// reduced to their role.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicTrackingEvent {
    pub status: ParcelStatus,
    pub note: String,
    pub location: Option<GeoPoint>,
    pub updated_by: Role,
    pub timestamp: DateTime<Utc>,
}

impl From<&TrackingEvent> for PublicTrackingEvent {
    fn from(event: &TrackingEvent) -> Self {
        Self {
            status: event.status,
            note: event.note.clone(),
            location: event.location,
            updated_by: event.updated_by,
            timestamp: event.timestamp,
        }
    }
}

/// Public tracking view of a parcel. No account ids, no receiver phone.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParcelTracking {
    pub tracking_id: String,
    pub parcel_type: String,
    pub weight_kg: f64,
    pub fee: f64,
    pub status: ParcelStatus,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub delivery_date: DateTime<Utc>,
    pub tracking_events: Vec<PublicTrackingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Parcel> for ParcelTracking {
    fn from(parcel: &Parcel) -> Self {
        Self {
            tracking_id: parcel.tracking_id.clone(),
            parcel_type: parcel.parcel_type.clone(),
            weight_kg: parcel.weight_kg,
            fee: parcel.fee,
            status: parcel.status,
            pickup_address: parcel.pickup_address.clone(),
            delivery_address: parcel.delivery_address.clone(),
            delivery_date: parcel.delivery_date,
            tracking_events: parcel
                .tracking_events
                .iter()
                .map(PublicTrackingEvent::from)
                .collect(),
            created_at: parcel.created_at,
            updated_at: parcel.updated_at,
        }
    }
}

pub fn generate_tracking_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "TRK-{}-{}",
        now.format("%Y%m%d"),
        suffix[..8].to_ascii_uppercase()
    )
}
