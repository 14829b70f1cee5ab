//! Operations stream client: connection lifecycle, keepalive, dispatch.
//!
//! The stream at `/api/ops/stream/` pushes departure, incident, standby
//! and system-status events as JSON envelopes. [`StreamClient`] keeps one
//! connection open, reconnects after unclean closes within a fixed budget,
//! and routes every recognized message to a [`StreamHandler`].

pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod heartbeat;
pub mod messages;
pub mod policy;
pub mod transport;

pub use client::StreamClient;
pub use connection::{ConnectionManager, ConnectionState, Effect};
pub use dispatcher::{Dispatched, Dispatcher};
pub use handler::{Callbacks, ChannelHandler, StreamHandler, StreamNotification};
pub use messages::{Envelope, InboundKind};
pub use policy::ReconnectPolicy;
pub use transport::{CloseEvent, Connector, Transport, TransportEvent, TungsteniteConnector};
