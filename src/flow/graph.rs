//! Static parcel lifecycle table.
//!
//! Each row names the statuses a parcel may move to from a given status and
//! the roles allowed to make that move. The table is data only; deciding
//! whether a particular request is legal lives in [`crate::flow::validator`].

use serde::Serialize;

use crate::models::parcel::ParcelStatus;
use crate::models::user::Role;

use ParcelStatus::*;
use Role::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub next: &'static [ParcelStatus],
    pub allowed_roles: &'static [Role],
}

impl TransitionRule {
    /// Returned for statuses that have no row. Behaves exactly like a terminal
    /// status: nothing follows and nobody may act.
    pub const EMPTY: TransitionRule = TransitionRule {
        next: &[],
        allowed_roles: &[],
    };

    pub fn is_terminal(&self) -> bool {
        self.next.is_empty()
    }

    pub fn leads_to(&self, status: ParcelStatus) -> bool {
        self.next.contains(&status)
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

pub const TRANSITION_TABLE: &[(ParcelStatus, TransitionRule)] = &[
    (
        Requested,
        TransitionRule {
            next: &[Approved, Blocked, Cancelled],
            allowed_roles: &[Admin, SuperAdmin, Sender],
        },
    ),
    (
        Blocked,
        TransitionRule {
            next: &[Requested],
            allowed_roles: &[Admin, SuperAdmin],
        },
    ),
    (
        Cancelled,
        TransitionRule {
            next: &[Requested],
            allowed_roles: &[Admin, Sender, SuperAdmin],
        },
    ),
    (
        Approved,
        TransitionRule {
            next: &[Cancelled, Pending, Assigned],
            allowed_roles: &[Admin, SuperAdmin, Sender],
        },
    ),
    (
        Pending,
        TransitionRule {
            next: &[Assigned],
            allowed_roles: &[Admin, SuperAdmin],
        },
    ),
    (
        Assigned,
        TransitionRule {
            next: &[PickedUp],
            allowed_roles: &[DeliveryAgent],
        },
    ),
    (
        PickedUp,
        TransitionRule {
            next: &[OnTheWay],
            allowed_roles: &[DeliveryAgent],
        },
    ),
    (
        OnTheWay,
        TransitionRule {
            next: &[Delivered],
            allowed_roles: &[DeliveryAgent],
        },
    ),
    (
        Delivered,
        TransitionRule {
            next: &[Confirmed, Returned],
            allowed_roles: &[Receiver],
        },
    ),
    (
        Confirmed,
        TransitionRule {
            next: &[],
            allowed_roles: &[Receiver],
        },
    ),
    (
        Returned,
        TransitionRule {
            next: &[Requested],
            allowed_roles: &[Admin, SuperAdmin, DeliveryAgent],
        },
    ),
];

pub fn rule_for(status: ParcelStatus) -> Option<&'static TransitionRule> {
    TRANSITION_TABLE
        .iter()
        .find(|(from, _)| *from == status)
        .map(|(_, rule)| rule)
}

pub fn transitions_from(status: ParcelStatus) -> TransitionRule {
    rule_for(status).copied().unwrap_or(TransitionRule::EMPTY)
}

/// Lookup by wire name, for read models that still carry raw strings.
pub fn transitions_from_name(status: &str) -> TransitionRule {
    status
        .parse::<ParcelStatus>()
        .map(transitions_from)
        .unwrap_or(TransitionRule::EMPTY)
}
