//! Service-departure records carried by `departure_update` messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a scheduled service departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureStatus {
    /// Planned and not yet boarding.
    Scheduled,
    /// Passengers are boarding.
    Boarding,
    /// The train has left the platform.
    Departed,
    /// Running behind its planned departure.
    Delayed,
    /// The service will not run.
    Cancelled,
    /// A status this client does not know about.
    #[serde(other)]
    Other,
}

impl DepartureStatus {
    /// Returns `true` if the service is still expected to leave.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Boarding | Self::Delayed)
    }
}

/// A single service departure as published by the operations stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeparture {
    /// Trainset operating the service.
    pub train_id: String,
    /// Route the service runs on.
    pub route_id: String,
    /// Timetabled departure time.
    pub planned_departure: DateTime<Utc>,
    /// Observed departure time, once the train has left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_departure: Option<DateTime<Utc>>,
    /// Current status.
    pub status: DepartureStatus,
    /// Departure platform, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Reported delay in minutes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_minutes: Option<i64>,
    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceDeparture {
    /// Returns the delay against the timetable.
    ///
    /// Prefers the observed departure time and falls back to the reported
    /// `delay_minutes`. Early departures yield a zero delay.
    #[must_use]
    pub fn delay(&self) -> Option<chrono::Duration> {
        if let Some(actual) = self.actual_departure {
            let delta = actual - self.planned_departure;
            return Some(delta.max(chrono::Duration::zero()));
        }
        self.delay_minutes
            .map(|m| chrono::Duration::minutes(m.max(0)))
    }
}
