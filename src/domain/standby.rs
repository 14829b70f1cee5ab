//! Standby-deployment records carried by `standby_deployed` messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A standby trainset pressed into service in place of another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandbyDeployment {
    /// Trainset taken from standby.
    pub standby_train_id: String,
    /// Service the standby train replaces.
    pub replacement_for_service_id: String,
    /// When the deployment was ordered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    /// Why the deployment was needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
