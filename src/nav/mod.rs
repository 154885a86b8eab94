//! Role-based dashboard navigation.

use serde::Serialize;

use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub title: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavSection {
    pub title: &'static str,
    pub items: &'static [NavItem],
}

const ADMIN_SECTIONS: &[NavSection] = &[NavSection {
    title: "User and Parcel Management",
    items: &[
        NavItem {
            title: "All Sender and Receiver",
            url: "/admin/all-user",
        },
        NavItem {
            title: "All Delivery Agent",
            url: "/admin/all-delivery-agent",
        },
        NavItem {
            title: "All Parcel",
            url: "/admin/all-parcel",
        },
    ],
}];

const SENDER_SECTIONS: &[NavSection] = &[NavSection {
    title: "Parcel",
    items: &[
        NavItem {
            title: "Create Parcel",
            url: "/sender/create-parcel",
        },
        NavItem {
            title: "Sender All Parcel",
            url: "/sender/all-parcel",
        },
    ],
}];

const DELIVERY_AGENT_SECTIONS: &[NavSection] = &[NavSection {
    title: "Deliveries",
    items: &[NavItem {
        title: "All Parcel",
        url: "/delivery-agent/all-parcel",
    }],
}];

const RECEIVER_SECTIONS: &[NavSection] = &[NavSection {
    title: "Parcel",
    items: &[
        NavItem {
            title: "Delivered and Confirmed Parcel",
            url: "/receiver/parcel/delivered-parcels",
        },
        NavItem {
            title: "Incoming Parcel",
            url: "/receiver/incoming-parcel",
        },
    ],
}];

/// Dashboard prefix guarded for each role. `SUPER_ADMIN` has no dashboard of
/// its own; the gate compares roles exactly, so it gets no admin links either.
const ROUTE_PREFIXES: &[(&str, Role)] = &[
    ("/admin", Role::Admin),
    ("/sender", Role::Sender),
    ("/receiver", Role::Receiver),
    ("/delivery-agent", Role::DeliveryAgent),
];

pub fn sidebar_for(role: Role) -> &'static [NavSection] {
    match role {
        Role::Admin => ADMIN_SECTIONS,
        Role::Sender => SENDER_SECTIONS,
        Role::DeliveryAgent => DELIVERY_AGENT_SECTIONS,
        Role::Receiver => RECEIVER_SECTIONS,
        Role::SuperAdmin => &[],
    }
}

/// Every route a role's dashboard mounts, in sidebar order.
pub fn routes_for(role: Role) -> Vec<&'static str> {
    sidebar_for(role)
        .iter()
        .flat_map(|section| section.items.iter().map(|item| item.url))
        .collect()
}

pub fn required_role_for(path: &str) -> Option<Role> {
    ROUTE_PREFIXES
        .iter()
        .find(|(prefix, _)| {
            path.strip_prefix(*prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
        .map(|(_, role)| *role)
}

/// Where the dashboard index redirects to.
pub fn default_route(role: Role) -> Option<&'static str> {
    routes_for(role).first().copied()
}
