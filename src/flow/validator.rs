use thiserror::Error;

use crate::flow::graph::transitions_from;
use crate::models::parcel::ParcelStatus;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionDenied {
    #[error("parcel is already {0}")]
    NoSelfTransition(ParcelStatus),

    #[error("{0} has no further transitions")]
    Terminal(ParcelStatus),

    #[error("{from} cannot move to {to}")]
    NotNextStatus {
        from: ParcelStatus,
        to: ParcelStatus,
    },

    #[error("{role} may not change a parcel that is {from}")]
    RoleNotAllowed { from: ParcelStatus, role: Role },
}

/// Explains why a transition is refused. Checks run in a fixed order so the
/// same request always gets the same reason.
pub fn check_transition(
    current: ParcelStatus,
    requested: ParcelStatus,
    actor: Role,
) -> Result<(), TransitionDenied> {
    if current == requested {
        return Err(TransitionDenied::NoSelfTransition(current));
    }

    let rule = transitions_from(current);
    if rule.is_terminal() {
        return Err(TransitionDenied::Terminal(current));
    }

    if !rule.leads_to(requested) {
        return Err(TransitionDenied::NotNextStatus {
            from: current,
            to: requested,
        });
    }

    if !rule.permits(actor) {
        return Err(TransitionDenied::RoleNotAllowed {
            from: current,
            role: actor,
        });
    }

    Ok(())
}

pub fn can_transition(current: ParcelStatus, requested: ParcelStatus, actor: Role) -> bool {
    check_transition(current, requested, actor).is_ok()
}

/// Next statuses a selector should offer `actor` for a parcel in `current`.
pub fn offered_statuses(current: ParcelStatus, actor: Role) -> Vec<ParcelStatus> {
    let rule = transitions_from(current);
    if !rule.permits(actor) {
        return Vec::new();
    }

    rule.next
        .iter()
        .copied()
        .filter(|next| *next != current)
        .collect()
}
