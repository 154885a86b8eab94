use chrono::{Duration, Utc};

use crate::auth::token::AuthSettings;
use crate::config::FeeSchedule;
use crate::models::parcel::Address;
use crate::models::user::{AvailableStatus, Role, User};
use crate::state::AppState;
use crate::workflow::parcels::{create_parcel, ParcelDetails};

pub struct Fixture {
    pub state: AppState,
    pub admin: User,
    pub sender: User,
    pub receiver: User,
    pub agent: User,
    pub tracking_id: String,
}

fn user(name: &str, phone: &str, role: Role) -> User {
    User::new(
        name.to_string(),
        format!("{}@example.com", name.to_lowercase()),
        phone.to_string(),
        "Road 12, Dhanmondi, Dhaka".to_string(),
        role,
    )
}

pub fn details(receiver_phone: &str) -> ParcelDetails {
    ParcelDetails {
        parcel_type: "Documents".to_string(),
        weight_kg: 2.5,
        receiver_phone: receiver_phone.to_string(),
        pickup_address: Address {
            address: "Banani 11, Dhaka".to_string(),
            latitude: 23.7937,
            longitude: 90.4066,
        },
        delivery_address: Address {
            address: "Agrabad, Chattogram".to_string(),
            latitude: 22.3260,
            longitude: 91.8121,
        },
        delivery_date: Utc::now() + Duration::days(3),
    }
}

/// One of each role plus a freshly requested parcel from sender to receiver.
/// The agent starts AVAILABLE.
pub fn fixture(fees: FeeSchedule) -> Fixture {
    let state = AppState::new(64, fees, &AuthSettings::for_tests());

    let admin = state.insert_user(user("Admin", "01500000000", Role::Admin));
    let sender = state.insert_user(user("Sender", "01600000000", Role::Sender));
    let receiver = state.insert_user(user("Receiver", "01700000000", Role::Receiver));

    let mut agent = user("Agent", "01800000000", Role::DeliveryAgent);
    agent.available_status = Some(AvailableStatus::Available);
    let agent = state.insert_user(agent);

    let parcel = create_parcel(&state, &sender, details(&receiver.phone))
        .expect("fixture parcel is valid");

    Fixture {
        tracking_id: parcel.tracking_id,
        state,
        admin,
        sender,
        receiver,
        agent,
    }
}
