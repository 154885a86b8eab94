use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::parcel::GeoPoint;
use crate::models::user::{AvailableStatus, Role, User};
use crate::state::AppState;

pub fn has_active_parcels(state: &AppState, agent_id: Uuid) -> bool {
    state.parcels.iter().any(|entry| {
        entry.delivery_agent == Some(agent_id) && entry.status.occupies_agent()
    })
}

/// In-flight key held while an assignment has claimed the agent but not yet
/// written it onto the parcel.
pub fn agent_slot_key(agent_id: Uuid) -> String {
    format!("agent:{agent_id}")
}

/// Puts a busy agent back to AVAILABLE once nothing is left in their hands.
/// Offline agents stay offline, and an agent claimed by an assignment still
/// in progress stays BUSY.
pub fn release_agent(state: &AppState, agent_id: Uuid) {
    // Checked under the agent's entry lock; a claim takes the same lock.
    if let Some(mut agent) = state.users.get_mut(&agent_id) {
        if agent.available_status == Some(AvailableStatus::Busy)
            && !state.in_flight.is_in_flight(&agent_slot_key(agent_id))
            && !has_active_parcels(state, agent_id)
        {
            agent.available_status = Some(AvailableStatus::Available);
            debug!(agent_id = %agent_id, "delivery agent released");
        }
    }
    state.refresh_agent_gauge();
}

/// The agent's own online/offline toggle. BUSY is managed by assignment and
/// cannot be requested directly.
pub fn set_availability(
    state: &AppState,
    agent: &User,
    requested: AvailableStatus,
    location: Option<GeoPoint>,
) -> Result<User, AppError> {
    if agent.role != Role::DeliveryAgent {
        return Err(AppError::Forbidden(
            "only delivery agents have an availability".to_string(),
        ));
    }

    if requested == AvailableStatus::Busy {
        return Err(AppError::BadRequest(
            "BUSY is set by parcel assignment".to_string(),
        ));
    }

    if has_active_parcels(state, agent.id) {
        return Err(AppError::Conflict(
            "finish active deliveries before changing availability".to_string(),
        ));
    }

    let updated = {
        let mut stored = state
            .users
            .get_mut(&agent.id)
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", agent.id)))?;
        if stored.available_status == Some(AvailableStatus::Busy) {
            return Err(AppError::Conflict(
                "finish active deliveries before changing availability".to_string(),
            ));
        }
        stored.available_status = Some(requested);
        if location.is_some() {
            stored.location = location;
        }
        stored.clone()
    };
    state.refresh_agent_gauge();

    info!(agent_id = %agent.id, status = ?requested, "agent availability changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeeSchedule;
    use crate::workflow::testing::fixture;

    #[test]
    fn agent_can_go_offline_and_back() {
        let f = fixture(FeeSchedule::default());

        let offline = set_availability(&f.state, &f.agent, AvailableStatus::Offline, None).unwrap();
        assert_eq!(offline.available_status, Some(AvailableStatus::Offline));

        let position = GeoPoint {
            lat: 23.8103,
            lng: 90.4125,
        };
        let online =
            set_availability(&f.state, &f.agent, AvailableStatus::Available, Some(position))
                .unwrap();
        assert_eq!(online.available_status, Some(AvailableStatus::Available));
        assert_eq!(online.location, Some(position));
    }

    #[test]
    fn busy_cannot_be_requested() {
        let f = fixture(FeeSchedule::default());
        let err = set_availability(&f.state, &f.agent, AvailableStatus::Busy, None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_agents_have_no_availability() {
        let f = fixture(FeeSchedule::default());
        let err =
            set_availability(&f.state, &f.sender, AvailableStatus::Available, None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn release_keeps_an_agent_claimed_by_an_assignment() {
        let f = fixture(FeeSchedule::default());
        f.state.users.get_mut(&f.agent.id).unwrap().available_status =
            Some(AvailableStatus::Busy);
        let claim = f.state.in_flight.try_acquire(&agent_slot_key(f.agent.id)).unwrap();

        release_agent(&f.state, f.agent.id);
        assert_eq!(
            f.state.users.get(&f.agent.id).unwrap().available_status,
            Some(AvailableStatus::Busy)
        );
        let err =
            set_availability(&f.state, &f.agent, AvailableStatus::Offline, None).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        drop(claim);
        release_agent(&f.state, f.agent.id);
        assert_eq!(
            f.state.users.get(&f.agent.id).unwrap().available_status,
            Some(AvailableStatus::Available)
        );
    }

    #[test]
    fn release_leaves_offline_agents_alone() {
        let f = fixture(FeeSchedule::default());
        set_availability(&f.state, &f.agent, AvailableStatus::Offline, None).unwrap();

        release_agent(&f.state, f.agent.id);

        assert_eq!(
            f.state.users.get(&f.agent.id).unwrap().available_status,
            Some(AvailableStatus::Offline)
        );
    }
}
