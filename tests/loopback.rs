//! Loopback tests: the real websocket transport against a local axum
//! server mounted at `/api/ops/stream/`.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;

use ops_stream::config::{STREAM_PATH, StreamConfig};
use ops_stream::ws::{ChannelHandler, InboundKind, StreamClient, StreamNotification};

const WAIT: Duration = Duration::from_secs(10);

/// What the server observed from the client.
#[derive(Debug, PartialEq)]
enum Seen {
    Text(Value),
    Close(Option<(u16, String)>),
}

/// How the server treats each accepted connection.
#[derive(Clone, Copy)]
enum Script {
    /// Push one departure update, then listen.
    Greet,
    /// Drop the first connection with code 1011, greet afterwards.
    FailFirst,
}

#[derive(Clone)]
struct ServerState {
    script: Script,
    connections: Arc<AtomicUsize>,
    seen: mpsc::UnboundedSender<Seen>,
}

async fn stream_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, state))
}

fn departure() -> Value {
    json!({
        "trainId": "TS-07",
        "routeId": "R-ALUVA-PETTA",
        "plannedDeparture": "2026-10-19T05:30:00Z",
        "status": "scheduled"
    })
}

async fn serve(mut socket: WebSocket, state: ServerState) {
    let n = state.connections.fetch_add(1, Ordering::SeqCst);
    if matches!(state.script, Script::FailFirst) && n == 0 {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: 1011,
                reason: "restarting".into(),
            })))
            .await;
        // The client must answer our close before dropping the socket.
        if let Ok(Some(Ok(Message::Close(frame)))) = timeout(WAIT, socket.recv()).await {
            let _ = state
                .seen
                .send(Seen::Close(frame.map(|f| (f.code, f.reason.to_string()))));
        }
        return;
    }

    let greeting = json!({
        "type": "departure_update",
        "data": departure(),
        "timestamp": "2026-10-19T05:29:00.000Z"
    });
    if socket.send(Message::text(greeting.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                    let _ = state.seen.send(Seen::Text(value));
                }
            }
            Message::Close(frame) => {
                let _ = state
                    .seen
                    .send(Seen::Close(frame.map(|f| (f.code, f.reason.to_string()))));
                break;
            }
            _ => {}
        }
    }
}

struct Server {
    url: String,
    connections: Arc<AtomicUsize>,
    seen: mpsc::UnboundedReceiver<Seen>,
}

async fn spawn_server(script: Script) -> Server {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind loopback listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener address");
    };
    let connections = Arc::new(AtomicUsize::new(0));
    let (seen_tx, seen) = mpsc::unbounded_channel();
    let app = Router::new()
        .route(STREAM_PATH, get(stream_handler))
        .with_state(ServerState {
            script,
            connections: Arc::clone(&connections),
            seen: seen_tx,
        });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Server {
        url: format!("ws://{addr}{STREAM_PATH}"),
        connections,
        seen,
    }
}

fn config(url: &str) -> StreamConfig {
    StreamConfig {
        heartbeat_interval: Duration::from_millis(100),
        reconnect_delay: Duration::from_millis(50),
        close_timeout: Duration::from_secs(1),
        ..StreamConfig::default()
    }
    .with_url(url)
}

async fn next_note(rx: &mut mpsc::UnboundedReceiver<StreamNotification>) -> StreamNotification {
    let Ok(Some(note)) = timeout(WAIT, rx.recv()).await else {
        panic!("no notification from client");
    };
    note
}

async fn next_seen(server: &mut Server) -> Seen {
    let Ok(Some(seen)) = timeout(WAIT, server.seen.recv()).await else {
        panic!("server saw nothing from client");
    };
    seen
}

#[tokio::test]
async fn receives_departure_and_sends_heartbeat() {
    let mut server = spawn_server(Script::Greet).await;
    let mut client = StreamClient::new(config(&server.url));
    let (handler, mut notes) = ChannelHandler::new();
    client.connect(Arc::new(handler));

    assert_eq!(next_note(&mut notes).await, StreamNotification::ConnectionChanged(true));
    assert!(client.is_connected());
    assert_eq!(
        next_note(&mut notes).await,
        StreamNotification::Message {
            kind: InboundKind::DepartureUpdate,
            data: departure(),
        }
    );

    let Seen::Text(ping) = next_seen(&mut server).await else {
        panic!("expected a ping");
    };
    assert_eq!(ping["type"], "ping");
    assert!(ping["timestamp"].is_string());

    client.disconnect();
    client.closed().await;
}

#[tokio::test]
async fn disconnect_sends_normal_close() {
    let mut server = spawn_server(Script::Greet).await;
    let mut client = StreamClient::new(StreamConfig {
        heartbeat_interval: Duration::from_secs(30),
        ..config(&server.url)
    });
    let (handler, mut notes) = ChannelHandler::new();
    client.connect(Arc::new(handler));
    assert_eq!(next_note(&mut notes).await, StreamNotification::ConnectionChanged(true));

    client.disconnect();
    assert_eq!(
        next_seen(&mut server).await,
        Seen::Close(Some((1000, "Client disconnect".to_string())))
    );

    loop {
        if next_note(&mut notes).await == StreamNotification::ConnectionChanged(false) {
            break;
        }
    }
    client.closed().await;
    assert!(!client.is_connected());
    assert_eq!(server.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_error_close_triggers_reconnect() {
    let mut server = spawn_server(Script::FailFirst).await;
    let mut client = StreamClient::new(config(&server.url));
    let (handler, mut notes) = ChannelHandler::new();
    client.connect(Arc::new(handler));

    let mut transitions = Vec::new();
    while transitions.len() < 3 {
        if let StreamNotification::ConnectionChanged(up) = next_note(&mut notes).await {
            transitions.push(up);
        }
    }
    assert_eq!(transitions, vec![true, false, true]);
    assert_eq!(server.connections.load(Ordering::SeqCst), 2);
    assert!(matches!(next_seen(&mut server).await, Seen::Close(Some((1011, _)))));

    client.disconnect();
    client.closed().await;
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_budget() {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind loopback listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener address");
    };
    drop(listener);

    let mut client = StreamClient::new(StreamConfig {
        max_reconnect_attempts: 2,
        ..config(&format!("ws://{addr}{STREAM_PATH}"))
    });
    let (handler, mut notes) = ChannelHandler::new();
    client.connect(Arc::new(handler));

    let mut errors = 0;
    let attempts = loop {
        match next_note(&mut notes).await {
            StreamNotification::Error(_) => errors += 1,
            StreamNotification::RetriesExhausted(n) => break n,
            _ => {}
        }
    };
    assert_eq!(attempts, 2);
    assert_eq!(errors, 3);
    client.closed().await;
}
