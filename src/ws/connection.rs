//! Connection lifecycle state machine.
//!
//! [`ConnectionManager`] owns the [`ConnectionState`], the reconnect
//! budget and the handler. It performs no I/O: each input (open, close,
//! error, timer, disconnect) updates the state, invokes the relevant
//! callbacks and returns the [`Effect`]s the session loop must carry out.
//!
//! ```text
//! Idle --connect--> Connecting --open--> Connected
//! Connected --clean close--> Closed
//! Connected/Connecting --unclean close, attempt < max--> Reconnecting --timer--> Connecting
//! Connected/Connecting --unclean close, attempt >= max--> Closed
//! any --disconnect--> Closed
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::handler::StreamHandler;
use super::policy::ReconnectPolicy;
use super::transport::{CLIENT_DISCONNECT_REASON, CLOSE_NORMAL, CloseEvent};
use crate::error::StreamError;

/// Message passed to `on_error` for any transport error.
pub const CONNECTION_ERROR_MESSAGE: &str = "WebSocket connection error";

/// Lifecycle state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not yet connected.
    #[default]
    Idle,
    /// A transport is being opened.
    Connecting,
    /// The transport is open.
    Connected,
    /// Waiting out the delay before the next attempt.
    Reconnecting,
    /// Terminal: disconnected by the caller or out of retries.
    Closed,
}

impl ConnectionState {
    /// Returns the state as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new transport.
    Open,
    /// Start the keepalive interval.
    StartHeartbeat,
    /// Stop the keepalive interval.
    StopHeartbeat,
    /// Arm the reconnect timer.
    ScheduleReconnect(Duration),
    /// Disarm the reconnect timer.
    CancelReconnect,
    /// Close the open transport.
    Close {
        /// Close code to send.
        code: u16,
        /// Close reason to send.
        reason: &'static str,
    },
}

/// Sans-IO connection lifecycle for one session.
pub struct ConnectionManager<H> {
    state: ConnectionState,
    policy: ReconnectPolicy,
    handler: Arc<H>,
    state_tx: watch::Sender<ConnectionState>,
    closing: bool,
}

impl<H> fmt::Debug for ConnectionManager<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("closing", &self.closing)
            .finish_non_exhaustive()
    }
}

impl<H: StreamHandler> ConnectionManager<H> {
    /// Creates an idle manager that publishes state changes on `state_tx`.
    #[must_use]
    pub fn new(
        policy: ReconnectPolicy,
        handler: Arc<H>,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        state_tx.send_replace(ConnectionState::Idle);
        Self {
            state: ConnectionState::Idle,
            policy,
            handler,
            state_tx,
            closing: false,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current reconnect budget.
    #[must_use]
    pub const fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Handler shared with the dispatcher.
    #[must_use]
    pub const fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Begins a connection attempt.
    pub fn connect(&mut self) -> Vec<Effect> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                tracing::debug!(state = %self.state, "connect ignored; already active");
                Vec::new()
            }
            ConnectionState::Idle | ConnectionState::Reconnecting | ConnectionState::Closed => {
                self.closing = false;
                self.transition(ConnectionState::Connecting);
                vec![Effect::CancelReconnect, Effect::Open]
            }
        }
    }

    /// The transport opened.
    pub fn on_open(&mut self) -> Vec<Effect> {
        self.policy.reset();
        self.transition(ConnectionState::Connected);
        self.handler.on_connection_change(true);
        vec![Effect::StartHeartbeat]
    }

    /// The transport reported an error. Diagnostic only; the close that
    /// follows drives the state machine.
    pub fn on_error(&mut self, error: &StreamError) {
        tracing::error!(error = %error, state = %self.state, "stream transport error");
        self.handler.on_error(CONNECTION_ERROR_MESSAGE);
    }

    /// The transport closed (or failed to open).
    pub fn on_close(&mut self, event: &CloseEvent) -> Vec<Effect> {
        if self.state == ConnectionState::Closed {
            return Vec::new();
        }

        let mut effects = vec![Effect::StopHeartbeat];
        self.handler.on_connection_change(false);

        if self.closing || event.is_clean() {
            tracing::info!(code = event.code, reason = %event.reason, "stream closed");
            self.transition(ConnectionState::Closed);
            return effects;
        }

        let lost = StreamError::ConnectionLost {
            code: event.code,
            reason: event.reason.clone(),
        };
        match self.policy.next_delay() {
            Some(delay) => {
                tracing::info!(
                    error = %lost,
                    attempt = self.policy.attempt(),
                    max_attempts = self.policy.max_attempts(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling reconnect"
                );
                self.transition(ConnectionState::Reconnecting);
                effects.push(Effect::ScheduleReconnect(delay));
            }
            None => {
                let attempts = self.policy.attempt();
                let exhausted = StreamError::ConnectionExhausted { attempts };
                tracing::warn!(error = %exhausted, last = %lost, "giving up on stream");
                self.transition(ConnectionState::Closed);
                self.handler.on_retries_exhausted(attempts);
            }
        }
        effects
    }

    /// The reconnect delay elapsed.
    pub fn on_reconnect_due(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Reconnecting {
            return Vec::new();
        }
        tracing::info!(attempt = self.policy.attempt(), "reconnecting");
        self.transition(ConnectionState::Connecting);
        vec![Effect::Open]
    }

    /// The caller asked to disconnect.
    ///
    /// Cancels any pending reconnect. An open transport is closed with
    /// code 1000 and the state settles to `Closed` on its close event;
    /// otherwise the state becomes `Closed` immediately.
    pub fn disconnect(&mut self) -> Vec<Effect> {
        self.closing = true;
        match self.state {
            ConnectionState::Closed => Vec::new(),
            ConnectionState::Connected => vec![
                Effect::CancelReconnect,
                Effect::StopHeartbeat,
                Effect::Close {
                    code: CLOSE_NORMAL,
                    reason: CLIENT_DISCONNECT_REASON,
                },
            ],
            ConnectionState::Idle | ConnectionState::Connecting | ConnectionState::Reconnecting => {
                self.transition(ConnectionState::Closed);
                vec![Effect::CancelReconnect, Effect::StopHeartbeat]
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "connection state change");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }
}
