//! Fleet-wide operations snapshot carried by `system_status` messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Aggregate operating figures for the current service day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsSnapshot {
    /// Services scheduled so far.
    pub total_services: u32,
    /// Services that departed on time.
    pub on_time_services: u32,
    /// Incidents not yet resolved.
    pub active_incidents: u32,
    /// Overall status label (e.g. `normal`, `degraded`).
    pub system_status: String,
    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OperationsSnapshot {
    /// Share of services that ran on time, in `[0, 1]`.
    ///
    /// Returns `None` before any service has been scheduled.
    #[must_use]
    pub fn on_time_ratio(&self) -> Option<f64> {
        if self.total_services == 0 {
            return None;
        }
        let ratio = f64::from(self.on_time_services) / f64::from(self.total_services);
        Some(ratio.min(1.0))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn snapshot(total: u32, on_time: u32) -> OperationsSnapshot {
        OperationsSnapshot {
            total_services: total,
            on_time_services: on_time,
            active_incidents: 0,
            system_status: "normal".to_string(),
            extra: Map::new(),
        }
    }

    #[test]
    fn ratio_of_empty_day_is_none() {
        assert_eq!(snapshot(0, 0).on_time_ratio(), None);
    }

    #[test]
    fn ratio_is_share_of_total() {
        let Some(ratio) = snapshot(200, 190).on_time_ratio() else {
            panic!("ratio expected");
        };
        assert!((ratio - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_wire_shape() {
        let raw = serde_json::json!({
            "totalServices": 120,
            "onTimeServices": 114,
            "activeIncidents": 2,
            "systemStatus": "degraded",
            "fleetAvailability": 0.92
        });
        let Ok(snap) = serde_json::from_value::<OperationsSnapshot>(raw) else {
            panic!("snapshot must decode");
        };
        assert_eq!(snap.active_incidents, 2);
        assert!(snap.extra.contains_key("fleetAvailability"));
    }
}
