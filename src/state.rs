use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::token::{AuthSettings, TokenAuthority};
use crate::config::FeeSchedule;
use crate::models::parcel::{Parcel, PublicTrackingEvent, TrackingEvent};
use crate::models::user::{AvailableStatus, Role, User};
use crate::observability::metrics::Metrics;
use crate::workflow::guard::InFlightGuard;

/// Pushed to `/ws` subscribers whenever a parcel gains a tracking event.
/// Carries no user ids; anyone holding the tracking id may watch.
#[derive(Debug, Clone, Serialize)]
pub struct ParcelEvent {
    pub tracking_id: String,
    pub event: PublicTrackingEvent,
}

pub struct AppState {
    pub users: DashMap<Uuid, User>,
    pub parcels: DashMap<String, Parcel>,
    pub in_flight: InFlightGuard,
    pub parcel_events_tx: broadcast::Sender<ParcelEvent>,
    pub fees: FeeSchedule,
    pub tokens: TokenAuthority,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, fees: FeeSchedule, auth: &AuthSettings) -> Self {
        let (parcel_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            users: DashMap::new(),
            parcels: DashMap::new(),
            in_flight: InFlightGuard::new(),
            parcel_events_tx,
            fees,
            tokens: TokenAuthority::new(auth),
            metrics: Metrics::new(),
        }
    }

    pub fn insert_user(&self, user: User) -> User {
        self.users.insert(user.id, user.clone());
        self.refresh_agent_gauge();
        user
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| entry.email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone())
    }

    /// The receiver a new parcel for `phone` is bound to. Blocked receivers
    /// cannot be sent parcels.
    pub fn find_receiver_by_phone(&self, phone: &str) -> Option<User> {
        self.users
            .iter()
            .find(|entry| {
                entry.role == Role::Receiver
                    && !entry.is_deleted
                    && !entry.is_blocked
                    && entry.phone == phone
            })
            .map(|entry| entry.value().clone())
    }

    /// Whether a live receiver account, blocked or not, already owns `phone`.
    pub fn receiver_phone_taken(&self, phone: &str) -> bool {
        self.users.iter().any(|entry| {
            entry.role == Role::Receiver && !entry.is_deleted && entry.phone == phone
        })
    }

    pub fn publish(&self, tracking_id: &str, event: &TrackingEvent) {
        let _ = self.parcel_events_tx.send(ParcelEvent {
            tracking_id: tracking_id.to_string(),
            event: PublicTrackingEvent::from(event),
        });
    }

    pub fn refresh_agent_gauge(&self) {
        let active = self
            .users
            .iter()
            .filter(|entry| {
                entry.role == Role::DeliveryAgent
                    && !entry.is_deleted
                    && matches!(
                        entry.available_status,
                        Some(AvailableStatus::Available | AvailableStatus::Busy)
                    )
            })
            .count();
        self.metrics.active_agents.set(active as i64);
    }
}
