//! # ops-stream
//!
//! Resilient client for the real-time operations event stream of a
//! rail-fleet induction and monitoring dashboard.
//!
//! The client keeps a websocket open to `/api/ops/stream/`, sends a
//! keepalive ping every 30 seconds, reconnects after unclean closes with a
//! fixed delay and a bounded budget, and routes inbound departure,
//! incident, standby and system-status messages to typed callbacks.
//!
//! ## Architecture
//!
//! ```text
//! Dashboard
//!     │  connect(handler) / send / is_connected / disconnect
//!     ▼
//! StreamClient (ws/client)
//!     │  one session task per connect
//!     ├── ConnectionManager (ws/connection)  state machine + retry budget
//!     ├── Heartbeat (ws/heartbeat)           30 s ping
//!     ├── Dispatcher (ws/dispatcher)         type → callback
//!     │
//!     └── Transport (ws/transport)           tokio-tungstenite
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ops_stream::config::StreamConfig;
//! use ops_stream::ws::{Callbacks, StreamClient};
//!
//! # async fn run() -> Result<(), ops_stream::error::StreamError> {
//! let mut client = StreamClient::new(StreamConfig::from_env()?);
//! client.connect(Arc::new(
//!     Callbacks::new()
//!         .departure_update(|data| println!("departure: {data}"))
//!         .connection_change(|live| println!("live data: {live}")),
//! ));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ws;
