//! Typed view of a dispatched operations message.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Incident, OperationsSnapshot, ServiceDeparture, StandbyDeployment};
use crate::error::StreamError;
use crate::ws::messages::InboundKind;

/// A recognized stream message with its `data` decoded into a record.
///
/// The dispatcher hands handlers the raw `data` value untouched; this type
/// is for consumers that want the typed shape.
#[derive(Debug, Clone, PartialEq)]
pub enum OpsEvent {
    /// A departure was added or changed.
    DepartureUpdate(ServiceDeparture),
    /// A new incident was reported.
    IncidentCreated(Incident),
    /// An existing incident changed status or was resolved.
    IncidentUpdated(Incident),
    /// A standby trainset was deployed.
    StandbyDeployed(StandbyDeployment),
    /// Fleet-wide operating figures.
    SystemStatus(OperationsSnapshot),
}

impl OpsEvent {
    /// Decodes the `data` of a message with the given tag.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidPayload`] if `data` does not match the
    /// record shape for `kind`.
    pub fn decode(kind: InboundKind, data: &Value) -> Result<Self, StreamError> {
        Ok(match kind {
            InboundKind::DepartureUpdate => Self::DepartureUpdate(record(kind, data)?),
            InboundKind::IncidentCreated => Self::IncidentCreated(record(kind, data)?),
            InboundKind::IncidentUpdated => Self::IncidentUpdated(record(kind, data)?),
            InboundKind::StandbyDeployed => Self::StandbyDeployed(record(kind, data)?),
            InboundKind::SystemStatus => Self::SystemStatus(record(kind, data)?),
        })
    }

    /// Returns the wire tag this event was decoded from.
    #[must_use]
    pub const fn kind(&self) -> InboundKind {
        match self {
            Self::DepartureUpdate(_) => InboundKind::DepartureUpdate,
            Self::IncidentCreated(_) => InboundKind::IncidentCreated,
            Self::IncidentUpdated(_) => InboundKind::IncidentUpdated,
            Self::StandbyDeployed(_) => InboundKind::StandbyDeployed,
            Self::SystemStatus(_) => InboundKind::SystemStatus,
        }
    }

    /// Returns the trainset the event concerns, if any.
    #[must_use]
    pub fn train_id(&self) -> Option<&str> {
        match self {
            Self::DepartureUpdate(d) => Some(&d.train_id),
            Self::IncidentCreated(i) | Self::IncidentUpdated(i) => Some(&i.train_id),
            Self::StandbyDeployed(s) => Some(&s.standby_train_id),
            Self::SystemStatus(_) => None,
        }
    }
}

fn record<T: DeserializeOwned>(kind: InboundKind, data: &Value) -> Result<T, StreamError> {
    T::deserialize(data).map_err(|source| StreamError::InvalidPayload {
        kind: kind.as_str(),
        source,
    })
}
