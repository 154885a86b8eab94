use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::parcel::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Sender,
    Receiver,
    DeliveryAgent,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Sender,
        Role::Receiver,
        Role::DeliveryAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Sender => "SENDER",
            Role::Receiver => "RECEIVER",
            Role::DeliveryAgent => "DELIVERY_AGENT",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Roles a user may pick for themselves at registration.
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Role::Sender | Role::Receiver | Role::DeliveryAgent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailableStatus {
    Available,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Bike,
    Car,
    Van,
    Truck,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Expert,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    pub vehicle_type: VehicleType,
    pub license_number: String,
    pub experience_level: ExperienceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub role: Role,
    /// Only meaningful for delivery agents.
    pub available_status: Option<AvailableStatus>,
    pub location: Option<GeoPoint>,
    pub agent_profile: Option<AgentProfile>,
    pub is_blocked: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    /// bcrypt hash; empty for accounts that cannot log in.
    #[serde(skip)]
    pub password_hash: String,
}

impl User {
    pub fn new(name: String, email: String, phone: String, address: String, role: Role) -> Self {
        let available_status = (role == Role::DeliveryAgent).then_some(AvailableStatus::Offline);

        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            address,
            role,
            available_status,
            location: None,
            agent_profile: None,
            is_blocked: false,
            is_deleted: false,
            created_at: Utc::now(),
            password_hash: String::new(),
        }
    }

    /// A resolved identity the route gate accepts as logged in.
    pub fn has_identity(&self) -> bool {
        !self.email.trim().is_empty() && !self.is_deleted && !self.is_blocked
    }

    pub fn is_available_agent(&self) -> bool {
        self.role == Role::DeliveryAgent
            && !self.is_blocked
            && !self.is_deleted
            && self.available_status == Some(AvailableStatus::Available)
    }
}
