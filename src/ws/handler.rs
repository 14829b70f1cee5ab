//! Callback registry supplied to [`super::StreamClient::connect`].
//!
//! [`StreamHandler`] is the fixed set of named handlers the session
//! invokes. Every method defaults to a no-op, so implementors override
//! only what they render. Two ready-made implementations are provided:
//! [`Callbacks`] (closures) and [`ChannelHandler`] (forwards
//! [`StreamNotification`]s into a tokio channel).

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use super::messages::InboundKind;

/// Receiver of stream events for one connection.
///
/// Handlers are shared read-only with the session task for the lifetime
/// of the connection. Callbacks run on the session task, one at a time,
/// and should return quickly.
pub trait StreamHandler: Send + Sync + 'static {
    /// A `departure_update` message arrived.
    fn on_departure_update(&self, _data: Value) {}

    /// An `incident_created` message arrived.
    fn on_incident_created(&self, _data: Value) {}

    /// An `incident_updated` message arrived.
    fn on_incident_updated(&self, _data: Value) {}

    /// A `standby_deployed` message arrived.
    fn on_standby_deployed(&self, _data: Value) {}

    /// A `system_status` message arrived.
    fn on_system_status(&self, _data: Value) {}

    /// The transport opened (`true`) or closed (`false`).
    fn on_connection_change(&self, _connected: bool) {}

    /// The transport reported an error. Diagnostic only.
    fn on_error(&self, _message: &str) {}

    /// The reconnect budget is spent and the session has stopped.
    ///
    /// Fires once, after the final `on_connection_change(false)`.
    fn on_retries_exhausted(&self, _attempts: u32) {}
}

type DataFn = Box<dyn Fn(Value) + Send + Sync>;

/// Closure-based [`StreamHandler`].
///
/// ```
/// use ops_stream::ws::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .departure_update(|data| println!("departure: {data}"))
///     .connection_change(|up| println!("live: {up}"));
/// # let _ = callbacks;
/// ```
#[derive(Default)]
pub struct Callbacks {
    departure_update: Option<DataFn>,
    incident_created: Option<DataFn>,
    incident_updated: Option<DataFn>,
    standby_deployed: Option<DataFn>,
    system_status: Option<DataFn>,
    connection_change: Option<Box<dyn Fn(bool) + Send + Sync>>,
    error: Option<Box<dyn Fn(&str) + Send + Sync>>,
    retries_exhausted: Option<Box<dyn Fn(u32) + Send + Sync>>,
}

impl Callbacks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `departure_update` handler.
    #[must_use]
    pub fn departure_update(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.departure_update = Some(Box::new(f));
        self
    }

    /// Sets the `incident_created` handler.
    #[must_use]
    pub fn incident_created(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.incident_created = Some(Box::new(f));
        self
    }

    /// Sets the `incident_updated` handler.
    #[must_use]
    pub fn incident_updated(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.incident_updated = Some(Box::new(f));
        self
    }

    /// Sets the `standby_deployed` handler.
    #[must_use]
    pub fn standby_deployed(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.standby_deployed = Some(Box::new(f));
        self
    }

    /// Sets the `system_status` handler.
    #[must_use]
    pub fn system_status(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.system_status = Some(Box::new(f));
        self
    }

    /// Sets the connection-change handler.
    #[must_use]
    pub fn connection_change(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.connection_change = Some(Box::new(f));
        self
    }

    /// Sets the error handler.
    #[must_use]
    pub fn error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Sets the retry-exhaustion handler.
    #[must_use]
    pub fn retries_exhausted(mut self, f: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.retries_exhausted = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("departure_update", &self.departure_update.is_some())
            .field("incident_created", &self.incident_created.is_some())
            .field("incident_updated", &self.incident_updated.is_some())
            .field("standby_deployed", &self.standby_deployed.is_some())
            .field("system_status", &self.system_status.is_some())
            .field("connection_change", &self.connection_change.is_some())
            .field("error", &self.error.is_some())
            .field("retries_exhausted", &self.retries_exhausted.is_some())
            .finish()
    }
}

impl StreamHandler for Callbacks {
    fn on_departure_update(&self, data: Value) {
        if let Some(f) = &self.departure_update {
            f(data);
        }
    }

    fn on_incident_created(&self, data: Value) {
        if let Some(f) = &self.incident_created {
            f(data);
        }
    }

    fn on_incident_updated(&self, data: Value) {
        if let Some(f) = &self.incident_updated {
            f(data);
        }
    }

    fn on_standby_deployed(&self, data: Value) {
        if let Some(f) = &self.standby_deployed {
            f(data);
        }
    }

    fn on_system_status(&self, data: Value) {
        if let Some(f) = &self.system_status {
            f(data);
        }
    }

    fn on_connection_change(&self, connected: bool) {
        if let Some(f) = &self.connection_change {
            f(connected);
        }
    }

    fn on_error(&self, message: &str) {
        if let Some(f) = &self.error {
            f(message);
        }
    }

    fn on_retries_exhausted(&self, attempts: u32) {
        if let Some(f) = &self.retries_exhausted {
            f(attempts);
        }
    }
}

/// One handler invocation, as delivered by [`ChannelHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamNotification {
    /// A recognized message with its untouched `data`.
    Message {
        /// Wire tag of the message.
        kind: InboundKind,
        /// Payload exactly as received.
        data: Value,
    },
    /// The transport opened or closed.
    ConnectionChanged(bool),
    /// The transport reported an error.
    Error(String),
    /// The reconnect budget is spent.
    RetriesExhausted(u32),
}

/// [`StreamHandler`] that forwards every callback into an unbounded
/// channel, for consumers that prefer `recv().await` over callbacks.
///
/// Notifications are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<StreamNotification>,
}

impl ChannelHandler {
    /// Creates a handler and the receiver that observes it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, notification: StreamNotification) {
        let _ = self.tx.send(notification);
    }

    fn message(&self, kind: InboundKind, data: Value) {
        self.forward(StreamNotification::Message { kind, data });
    }
}

impl StreamHandler for ChannelHandler {
    fn on_departure_update(&self, data: Value) {
        self.message(InboundKind::DepartureUpdate, data);
    }

    fn on_incident_created(&self, data: Value) {
        self.message(InboundKind::IncidentCreated, data);
    }

    fn on_incident_updated(&self, data: Value) {
        self.message(InboundKind::IncidentUpdated, data);
    }

    fn on_standby_deployed(&self, data: Value) {
        self.message(InboundKind::StandbyDeployed, data);
    }

    fn on_system_status(&self, data: Value) {
        self.message(InboundKind::SystemStatus, data);
    }

    fn on_connection_change(&self, connected: bool) {
        self.forward(StreamNotification::ConnectionChanged(connected));
    }

    fn on_error(&self, message: &str) {
        self.forward(StreamNotification::Error(message.to_string()));
    }

    fn on_retries_exhausted(&self, attempts: u32) {
        self.forward(StreamNotification::RetriesExhausted(attempts));
    }
}
