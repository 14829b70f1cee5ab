//! Public client surface and the per-session event loop.
//!
//! [`StreamClient::connect`] spawns one session task that owns the
//! transport, the heartbeat, the reconnect timer and the
//! [`ConnectionManager`]. The task handles one event at a time, so none of
//! that state is shared or locked. The client keeps only channel ends:
//!
//! - a `watch` receiver with the published [`ConnectionState`];
//! - a `watch` shutdown flag, set synchronously by `disconnect`;
//! - an mpsc sender for outbound envelopes.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::connection::{ConnectionManager, ConnectionState, Effect};
use super::dispatcher::Dispatcher;
use super::handler::StreamHandler;
use super::heartbeat::Heartbeat;
use super::messages::Envelope;
use super::policy::{ReconnectPolicy, ReconnectTimer};
use super::transport::{CloseEvent, Connector, Transport, TransportEvent, TungsteniteConnector};
use crate::config::StreamConfig;
use crate::error::StreamError;

/// Client for the live operations event stream.
///
/// One instance per dashboard session. Each [`connect`](Self::connect)
/// starts a session that keeps the stream open, reconnecting with a fixed
/// delay after unclean closes until the retry budget is spent.
/// [`disconnect`](Self::disconnect) is the only intentional way to stop it.
pub struct StreamClient<C: Connector = TungsteniteConnector> {
    config: StreamConfig,
    connector: Arc<C>,
    session: Option<Session>,
}

struct Session {
    id: Uuid,
    outbound_tx: mpsc::UnboundedSender<Envelope>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<C: Connector> std::fmt::Debug for StreamClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("url", &self.config.url)
            .field("session", &self.session.as_ref().map(|s| s.id))
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl StreamClient<TungsteniteConnector> {
    /// Creates a client that connects with `tokio-tungstenite`.
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        let connector = TungsteniteConnector::new(config.close_timeout);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> StreamClient<C> {
    /// Creates a client over a custom [`Connector`].
    #[must_use]
    pub fn with_connector(config: StreamConfig, connector: C) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            session: None,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Opens the stream and routes its events to `handler`.
    ///
    /// Returns immediately; progress is reported through the handler. A
    /// session already running is told to close cleanly first and is
    /// replaced. Must be called from within a tokio runtime.
    pub fn connect<H: StreamHandler>(&mut self, handler: Arc<H>) {
        if let Some(previous) = self.session.take() {
            tracing::info!(session = %previous.id, "superseding previous stream session");
            previous.shutdown_tx.send_replace(true);
        }

        let id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let policy = ReconnectPolicy::new(
            self.config.max_reconnect_attempts,
            self.config.reconnect_delay,
        );
        let manager = ConnectionManager::new(policy, handler, state_tx);
        let session = SessionLoop {
            connector: Arc::clone(&self.connector),
            url: self.config.url.clone(),
            manager,
            heartbeat: Heartbeat::new(self.config.heartbeat_interval),
            reconnect: ReconnectTimer::default(),
            transport: None,
            outbound_rx,
            shutdown_rx,
        };
        let span = tracing::info_span!("ops_stream", session = %id, url = %self.config.url);
        let task = tokio::spawn(session.run().instrument(span));

        self.session = Some(Session {
            id,
            outbound_tx,
            state_rx,
            shutdown_tx,
            task: Some(task),
        });
    }

    /// Sends `message` if the transport is open; otherwise drops it.
    ///
    /// Best effort, at most once: nothing is queued across reconnects.
    /// The message is written by the session task, so one accepted here
    /// is still dropped (with a warning) if the connection closes before
    /// the task gets to it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotConnected`] when the stream is not open,
    /// or [`StreamError::ConnectionClosed`] if the session has ended.
    pub fn send(&self, message: Envelope) -> Result<(), StreamError> {
        let Some(session) = self.session.as_ref().filter(|_| self.is_connected()) else {
            tracing::warn!(msg_type = %message.msg_type, "stream not connected; dropping message");
            return Err(StreamError::NotConnected);
        };
        session
            .outbound_tx
            .send(message)
            .map_err(|_| StreamError::ConnectionClosed)
    }

    /// Returns `true` iff the transport is open right now.
    ///
    /// Turns `false` as soon as [`disconnect`](Self::disconnect) is called,
    /// before the close handshake runs.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| {
            !*s.shutdown_tx.borrow() && *s.state_rx.borrow() == ConnectionState::Connected
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.session
            .as_ref()
            .map_or(ConnectionState::Idle, |s| *s.state_rx.borrow())
    }

    /// Watches lifecycle state changes of the current session.
    #[must_use]
    pub fn state_changes(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.session.as_ref().map(|s| s.state_rx.clone())
    }

    /// Closes the stream with code 1000 ("Client disconnect").
    ///
    /// Cancels any pending reconnect and the heartbeat before returning;
    /// the close handshake itself completes on the session task.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.as_ref()
            && !*session.shutdown_tx.borrow()
        {
            tracing::info!(session = %session.id, "disconnecting stream");
            session.shutdown_tx.send_replace(true);
        }
    }

    /// Waits for the current session task to finish.
    ///
    /// The session ends after [`disconnect`](Self::disconnect) or once the
    /// retry budget is spent.
    pub async fn closed(&mut self) {
        let Some(task) = self.session.as_mut().and_then(|s| s.task.take()) else {
            return;
        };
        if let Err(e) = task.await {
            tracing::error!(error = %e, "stream session task failed");
        }
    }
}

impl<C: Connector> Drop for StreamClient<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State owned by one running session task.
struct SessionLoop<C: Connector, H> {
    connector: Arc<C>,
    url: String,
    manager: ConnectionManager<H>,
    heartbeat: Heartbeat,
    reconnect: ReconnectTimer,
    transport: Option<C::Transport>,
    outbound_rx: mpsc::UnboundedReceiver<Envelope>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<C: Connector, H: StreamHandler> SessionLoop<C, H> {
    async fn run(mut self) {
        let dispatcher = Dispatcher::new(Arc::clone(self.manager.handler()));
        let mut effects: VecDeque<Effect> = self.manager.connect().into();

        loop {
            while let Some(effect) = effects.pop_front() {
                let follow_up = self.apply(effect).await;
                effects.extend(follow_up);
            }
            if self.manager.state() == ConnectionState::Closed {
                break;
            }

            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    effects.extend(self.manager.disconnect());
                }
                () = self.reconnect.fired() => {
                    effects.extend(self.manager.on_reconnect_due());
                }
                ping = self.heartbeat.tick() => {
                    self.write(ping).await;
                }
                Some(message) = self.outbound_rx.recv() => {
                    self.write(message).await;
                }
                event = next_event(&mut self.transport) => {
                    match event {
                        TransportEvent::Text(text) => {
                            dispatcher.dispatch(&text);
                        }
                        TransportEvent::Error(e) => self.manager.on_error(&e),
                        TransportEvent::Closed(close) => {
                            if let Some(mut transport) = self.transport.take() {
                                transport.finish().await;
                            }
                            effects.extend(self.manager.on_close(&close));
                        }
                    }
                }
            }
        }

        tracing::debug!(state = %self.manager.state(), "stream session finished");
    }

    async fn apply(&mut self, effect: Effect) -> Vec<Effect> {
        match effect {
            Effect::Open => self.open().await,
            Effect::StartHeartbeat => {
                self.heartbeat.start();
                Vec::new()
            }
            Effect::StopHeartbeat => {
                self.heartbeat.stop();
                Vec::new()
            }
            Effect::ScheduleReconnect(delay) => {
                self.reconnect.schedule(delay);
                Vec::new()
            }
            Effect::CancelReconnect => {
                self.reconnect.cancel();
                Vec::new()
            }
            Effect::Close { code, reason } => {
                let Some(mut transport) = self.transport.take() else {
                    return Vec::new();
                };
                if let Err(e) = transport.close(code, reason).await {
                    tracing::debug!(error = %e, "close handshake failed");
                }
                self.manager.on_close(&CloseEvent::client_disconnect())
            }
        }
    }

    async fn open(&mut self) -> Vec<Effect> {
        tracing::info!("connecting to operations stream");
        let connect = self.connector.connect(&self.url);
        let result = tokio::select! {
            biased;
            _ = self.shutdown_rx.changed() => None,
            result = connect => Some(result),
        };
        match result {
            None => self.manager.disconnect(),
            Some(Ok(transport)) => {
                self.transport = Some(transport);
                self.manager.on_open()
            }
            Some(Err(e)) => {
                self.manager.on_error(&e);
                self.manager.on_close(&CloseEvent::abnormal())
            }
        }
    }

    async fn write(&mut self, message: Envelope) {
        let Some(transport) = self.transport.as_mut() else {
            tracing::warn!(msg_type = %message.msg_type, "stream not connected; dropping message");
            return;
        };
        let text = match message.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, msg_type = %message.msg_type, "failed to encode message");
                return;
            }
        };
        if let Err(e) = transport.send_text(text).await {
            tracing::error!(error = %e, msg_type = %message.msg_type, "failed to send message");
        }
    }
}

async fn next_event<T: Transport>(transport: &mut Option<T>) -> TransportEvent {
    match transport.as_mut() {
        Some(transport) => transport.next_event().await,
        None => pending().await,
    }
}
