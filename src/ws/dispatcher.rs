//! Inbound frame dispatch.
//!
//! Parses each frame as an [`Envelope`] and routes its `data` to exactly
//! one [`StreamHandler`] callback selected by the `type` tag. Malformed
//! frames and unknown tags are logged and dropped; neither affects the
//! connection.

use std::sync::Arc;

use super::handler::StreamHandler;
use super::messages::{Envelope, InboundKind};

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The matching callback was invoked.
    Delivered(InboundKind),
    /// The envelope parsed but its `type` is not handled; no callback ran.
    Unrecognized(String),
    /// The frame was not a valid envelope; no callback ran.
    Malformed,
}

/// Routes parsed envelopes to a shared handler.
pub struct Dispatcher<H> {
    handler: Arc<H>,
}

impl<H> std::fmt::Debug for Dispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl<H: StreamHandler> Dispatcher<H> {
    /// Creates a dispatcher over `handler`.
    #[must_use]
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Parses and dispatches one text frame.
    pub fn dispatch(&self, text: &str) -> Dispatched {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, len = text.len(), "dropping unparsable stream frame");
                return Dispatched::Malformed;
            }
        };

        let kind = match envelope.msg_type.parse::<InboundKind>() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::warn!(msg_type = %envelope.msg_type, "unrecognized stream message type");
                return Dispatched::Unrecognized(envelope.msg_type);
            }
        };

        tracing::trace!(msg_type = %kind, "dispatching stream message");
        let data = envelope.into_data();
        match kind {
            InboundKind::DepartureUpdate => self.handler.on_departure_update(data),
            InboundKind::IncidentCreated => self.handler.on_incident_created(data),
            InboundKind::IncidentUpdated => self.handler.on_incident_updated(data),
            InboundKind::StandbyDeployed => self.handler.on_standby_deployed(data),
            InboundKind::SystemStatus => self.handler.on_system_status(data),
        }
        Dispatched::Delivered(kind)
    }
}
