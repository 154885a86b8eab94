//! Client-side status workflow.
//!
//! Sits between a dashboard control and the REST backend: refuses illegal
//! transitions before any request is made, keeps one request per parcel in
//! flight, and sorts failures into the kinds the UI surfaces differently.
//! The transport itself is behind [`ParcelApi`].

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::flow::validator::{check_transition, offered_statuses, TransitionDenied};
use crate::models::parcel::{GeoPoint, ParcelStatus};
use crate::models::user::Role;
use crate::workflow::guard::InFlightGuard;

/// The two fields of a parcel read model the workflow depends on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParcelSummary {
    pub tracking_id: String,
    pub status: ParcelStatus,
}

/// Body of `PATCH /parcel/status/:tracking_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub tracking_id: String,
    pub status: ParcelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub updated_by: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub expected_status: Option<ParcelStatus>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

pub trait ParcelApi {
    type Error: Display;

    fn update_status(
        &self,
        change: &StatusChange,
    ) -> impl Future<Output = Result<ApiReply, Self::Error>> + Send;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Refused locally; nothing was sent.
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionDenied),

    #[error("an update for {0} is already in progress")]
    InFlight(String),

    /// The server refused an update the client believed valid. The local
    /// view is stale and must be re-fetched.
    #[error("rejected by server: {0}")]
    ServerRejection(String),

    #[error("network error: {0}")]
    Network(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    pub fn requires_refetch(&self) -> bool {
        matches!(self, ClientError::ServerRejection(_))
    }
}

pub struct StatusUpdater<A> {
    api: A,
    in_flight: InFlightGuard,
}

impl<A> StatusUpdater<A>
where
    A: ParcelApi,
{
    pub fn new(api: A) -> Self {
        Self {
            api,
            in_flight: InFlightGuard::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Options for the parcel's status selector. Empty while a request for
    /// the same parcel is outstanding, which disables the control.
    pub fn offered(&self, parcel: &ParcelSummary, actor: Role) -> Vec<ParcelStatus> {
        if self.in_flight.is_in_flight(&parcel.tracking_id) {
            return Vec::new();
        }
        offered_statuses(parcel.status, actor)
    }

    pub fn is_updating(&self, tracking_id: &str) -> bool {
        self.in_flight.is_in_flight(tracking_id)
    }

    pub async fn update_status(
        &self,
        actor: Role,
        parcel: &ParcelSummary,
        requested: ParcelStatus,
        note: Option<String>,
        location: Option<GeoPoint>,
    ) -> Result<(), ClientError> {
        check_transition(parcel.status, requested, actor)?;

        let _slot = self
            .in_flight
            .try_acquire(&parcel.tracking_id)
            .ok_or_else(|| ClientError::InFlight(parcel.tracking_id.clone()))?;

        let change = StatusChange {
            tracking_id: parcel.tracking_id.clone(),
            status: requested,
            note,
            updated_by: actor,
            location,
            expected_status: Some(parcel.status),
        };

        match self.api.update_status(&change).await {
            Ok(reply) if reply.success => {
                debug!(tracking_id = %change.tracking_id, status = %requested, "status update accepted");
                Ok(())
            }
            Ok(reply) => {
                let message = reply
                    .message
                    .unwrap_or_else(|| "Failed to update parcel status".to_string());
                warn!(tracking_id = %change.tracking_id, message = %message, "status update rejected");
                Err(ClientError::ServerRejection(message))
            }
            Err(err) => {
                warn!(tracking_id = %change.tracking_id, error = %err, "status update failed");
                Err(ClientError::Network(err.to_string()))
            }
        }
    }
}
