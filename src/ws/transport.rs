//! Transport seam between the session loop and the websocket library.
//!
//! [`Connector`] opens one [`Transport`] per connection attempt. The
//! production implementation is [`TungsteniteConnector`]; tests drive the
//! session through in-memory implementations of the same traits.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::StreamError;

/// Close code of an intentional, orderly close.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Reason sent with a client-initiated close.
pub const CLIENT_DISCONNECT_REASON: &str = "Client disconnect";

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Websocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// Whether the close handshake completed.
    pub was_clean: bool,
}

impl CloseEvent {
    /// Builds a close event.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>, was_clean: bool) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean,
        }
    }

    /// Connection dropped without a close frame (code 1006).
    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(CLOSE_ABNORMAL, "", false)
    }

    /// Orderly close initiated by this client.
    #[must_use]
    pub fn client_disconnect() -> Self {
        Self::new(CLOSE_NORMAL, CLIENT_DISCONNECT_REASON, true)
    }

    /// Returns `true` for an orderly close (code 1000, handshake completed).
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.code == CLOSE_NORMAL && self.was_clean
    }
}

/// One event read from a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// A text (or UTF-8 decoded binary) frame.
    Text(String),
    /// The connection ended; the transport must not be used again.
    Closed(CloseEvent),
    /// A read error. The transport reports [`TransportEvent::Closed`] next.
    Error(StreamError),
}

/// An open, bidirectional message transport.
pub trait Transport: Send + 'static {
    /// Writes one text frame.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), StreamError>> + Send;

    /// Waits for the next event. Must be cancel-safe.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;

    /// Starts an orderly close and waits for the peer to finish it.
    fn close(&mut self, code: u16, reason: &str) -> impl Future<Output = Result<(), StreamError>> + Send;

    /// Completes a close started by the peer, after
    /// [`next_event`](Self::next_event) reported [`TransportEvent::Closed`].
    fn finish(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens transports to a stream endpoint.
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by a successful connect.
    type Transport: Transport;

    /// Opens a transport to `url`.
    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Transport, StreamError>> + Send;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    close_timeout: Duration,
}

impl TungsteniteConnector {
    /// Creates a connector whose transports wait up to `close_timeout`
    /// for the server to acknowledge a close.
    #[must_use]
    pub const fn new(close_timeout: Duration) -> Self {
        Self { close_timeout }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CLOSE_TIMEOUT)
    }
}

impl Connector for TungsteniteConnector {
    type Transport = TungsteniteTransport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, StreamError> {
        let (ws, response) = connect_async(url).await?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");
        Ok(TungsteniteTransport {
            ws,
            close_timeout: self.close_timeout,
            failed: false,
        })
    }
}

/// Websocket transport over TCP (or TLS with the `tls` feature).
pub struct TungsteniteTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    close_timeout: Duration,
    failed: bool,
}

impl std::fmt::Debug for TungsteniteTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TungsteniteTransport")
            .field("close_timeout", &self.close_timeout)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl Transport for TungsteniteTransport {
    async fn send_text(&mut self, text: String) -> Result<(), StreamError> {
        self.ws.send(Message::text(text)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> TransportEvent {
        if self.failed {
            return TransportEvent::Closed(CloseEvent::abnormal());
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text.to_string()),
                Some(Ok(Message::Binary(bytes))) => {
                    return TransportEvent::Text(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(Ok(Message::Close(frame))) => {
                    let event = match frame {
                        Some(frame) => {
                            CloseEvent::new(u16::from(frame.code), frame.reason.as_str(), true)
                        }
                        None => CloseEvent::new(1005, "", true),
                    };
                    return TransportEvent::Closed(event);
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => {
                    self.failed = true;
                    return TransportEvent::Error(e.into());
                }
                None => return TransportEvent::Closed(CloseEvent::abnormal()),
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), StreamError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.ws.close(Some(frame)).await?;
        self.drain().await;
        Ok(())
    }

    async fn finish(&mut self) {
        if !self.failed {
            self.drain().await;
        }
    }
}

impl TungsteniteTransport {
    /// Reads until the close handshake settles or the timeout passes.
    ///
    /// Reading also flushes the close reply tungstenite queues when the
    /// server closes first.
    async fn drain(&mut self) {
        let close_timeout = self.close_timeout;
        let ws = &mut self.ws;
        let drain = async move {
            while let Some(msg) = ws.next().await {
                if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                    break;
                }
            }
        };
        if tokio::time::timeout(close_timeout, drain).await.is_err() {
            tracing::debug!(timeout = ?close_timeout, "close handshake did not settle");
        }
    }
}
