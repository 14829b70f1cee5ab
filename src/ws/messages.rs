//! Stream message types: the wire envelope and recognized inbound tags.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::StreamError;

/// Wire tag of the client keepalive message.
pub const PING_TYPE: &str = "ping";

/// Top-level stream message envelope, used in both directions.
///
/// ```json
/// { "type": "departure_update", "data": { ... }, "timestamp": "2026-10-19T05:30:00.000Z" }
/// ```
///
/// `data` is omitted from outbound keepalives; inbound envelopes without
/// it are accepted and expose [`Value::Null`]. Only `type` is validated on
/// inbound frames: a non-string `timestamp` (epoch millis, say) is kept as
/// its JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// ISO-8601 timestamp with millisecond precision.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Envelope {
    /// Creates an envelope stamped with the current time.
    #[must_use]
    pub fn new(msg_type: impl Into<String>, data: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            data: Some(data),
            timestamp: Some(now_iso8601()),
        }
    }

    /// Creates a keepalive `{ "type": "ping", "timestamp": ... }`.
    #[must_use]
    pub fn ping() -> Self {
        Self {
            msg_type: PING_TYPE.to_string(),
            data: None,
            timestamp: Some(now_iso8601()),
        }
    }

    /// Parses an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::MalformedFrame`] if `text` is not a JSON
    /// object with a string `type` field.
    pub fn parse(text: &str) -> Result<Self, StreamError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::MalformedFrame`] if `data` cannot be
    /// serialized (e.g. a map with non-string keys was built by hand).
    pub fn to_text(&self) -> Result<String, StreamError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Consumes the envelope, returning `data` or [`Value::Null`].
    #[must_use]
    pub fn into_data(self) -> Value {
        self.data.unwrap_or(Value::Null)
    }
}

/// Current UTC time in the `YYYY-MM-DDTHH:MM:SS.mmmZ` form.
#[must_use]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Server → client message types the dispatcher routes to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    /// `departure_update`
    DepartureUpdate,
    /// `incident_created`
    IncidentCreated,
    /// `incident_updated`
    IncidentUpdated,
    /// `standby_deployed`
    StandbyDeployed,
    /// `system_status`
    SystemStatus,
}

impl InboundKind {
    /// All recognized kinds.
    pub const ALL: [Self; 5] = [
        Self::DepartureUpdate,
        Self::IncidentCreated,
        Self::IncidentUpdated,
        Self::StandbyDeployed,
        Self::SystemStatus,
    ];

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DepartureUpdate => "departure_update",
            Self::IncidentCreated => "incident_created",
            Self::IncidentUpdated => "incident_updated",
            Self::StandbyDeployed => "standby_deployed",
            Self::SystemStatus => "system_status",
        }
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboundKind {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StreamError::UnknownMessageType(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn ping_has_no_data_field() {
        let Ok(text) = Envelope::ping().to_text() else {
            panic!("ping must serialize");
        };
        let Ok(raw) = serde_json::from_str::<Value>(&text) else {
            panic!("ping must be json");
        };
        assert_eq!(raw["type"], "ping");
        assert!(raw.get("data").is_none());
        assert!(raw["timestamp"].is_string());
    }

    #[test]
    fn timestamp_is_iso8601_millis() {
        let ts = now_iso8601();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
        // 2026-10-19T05:30:00.000Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn parse_without_data_yields_null() {
        let Ok(env) = Envelope::parse(r#"{"type":"system_status"}"#) else {
            panic!("envelope without data must parse");
        };
        assert_eq!(env.msg_type, "system_status");
        assert_eq!(env.into_data(), Value::Null);
    }

    #[test]
    fn parse_keeps_numeric_timestamp_as_text() {
        let text = r#"{"type":"departure_update","data":{"trainId":"TS-03"},"timestamp":1760850000000}"#;
        let Ok(env) = Envelope::parse(text) else {
            panic!("numeric timestamp must not reject the frame");
        };
        assert_eq!(env.timestamp.as_deref(), Some("1760850000000"));
        assert_eq!(env.into_data(), serde_json::json!({ "trainId": "TS-03" }));

        let Ok(env) = Envelope::parse(r#"{"type":"system_status","timestamp":null}"#) else {
            panic!("null timestamp must parse");
        };
        assert_eq!(env.timestamp, None);
    }

    #[test]
    fn parse_rejects_non_json_and_missing_type() {
        assert!(Envelope::parse("ping").is_err());
        assert!(Envelope::parse(r#"{"data":{}}"#).is_err());
        assert!(Envelope::parse(r#"{"type":7}"#).is_err());
    }

    #[test]
    fn kinds_parse_from_wire_tags() {
        for kind in InboundKind::ALL {
            let Ok(parsed) = kind.as_str().parse::<InboundKind>() else {
                panic!("{kind} must parse");
            };
            assert_eq!(parsed, kind);
        }
        let Err(err) = "pong".parse::<InboundKind>() else {
            panic!("pong is not an inbound kind");
        };
        assert!(matches!(err, StreamError::UnknownMessageType(t) if t == "pong"));
    }

    #[test]
    fn new_envelope_carries_data() {
        let env = Envelope::new("incident_ack", serde_json::json!({ "id": "INC-1" }));
        assert_eq!(env.data, Some(serde_json::json!({ "id": "INC-1" })));
        assert!(env.timestamp.is_some());
    }
}
