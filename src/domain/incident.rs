//! Incident records carried by `incident_created` and `incident_updated`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operational impact of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No service impact expected.
    Low,
    /// Minor delays possible.
    Medium,
    /// Service disruption likely.
    High,
    /// Service cannot run; standby deployment expected.
    Critical,
    /// A severity this client does not know about.
    #[serde(other)]
    Other,
}

/// An incident reported against a trainset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Incident identifier, when the backend has assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Affected trainset.
    pub train_id: String,
    /// Reported severity.
    pub severity: Severity,
    /// Free-text description from the reporter.
    pub description: String,
    /// When the incident was reported.
    pub reported_at: DateTime<Utc>,
    /// Workflow status (e.g. `open`, `investigating`, `resolved`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Resolution notes, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// When the incident was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Incident {
    /// Returns `true` once the incident carries a resolution.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
            || self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("resolved"))
    }
}
