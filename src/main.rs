//! ops-stream entry point.
//!
//! Tails the live operations stream and logs every event until Ctrl-C or
//! until the reconnect budget is spent.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ops_stream::config::StreamConfig;
use ops_stream::domain::OpsEvent;
use ops_stream::ws::{ChannelHandler, StreamClient, StreamNotification};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StreamConfig::from_env()?;
    init_tracing();

    tracing::info!(url = %config.url, "starting ops-stream");

    let mut client = StreamClient::new(config);
    let (handler, mut notifications) = ChannelHandler::new();
    client.connect(Arc::new(handler));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
            note = notifications.recv() => {
                let Some(note) = note else { break };
                if !report(note) {
                    break;
                }
            }
        }
    }

    client.disconnect();
    client.closed().await;
    tracing::info!("ops-stream stopped");
    Ok(())
}

/// Initializes tracing. `LOG_FORMAT=json` selects JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Logs one notification. Returns `false` once the session cannot recover.
fn report(note: StreamNotification) -> bool {
    match note {
        StreamNotification::Message { kind, data } => match OpsEvent::decode(kind, &data) {
            Ok(event) => log_event(&event),
            Err(e) => tracing::warn!(error = %e, %data, "undecodable stream payload"),
        },
        StreamNotification::ConnectionChanged(true) => tracing::info!("live data connected"),
        StreamNotification::ConnectionChanged(false) => {
            tracing::warn!("live data disconnected; dashboard data may be stale");
        }
        StreamNotification::Error(message) => tracing::error!(%message, "stream error"),
        StreamNotification::RetriesExhausted(attempts) => {
            tracing::error!(attempts, "stream permanently disconnected; restart required");
            return false;
        }
    }
    true
}

fn log_event(event: &OpsEvent) {
    match event {
        OpsEvent::DepartureUpdate(d) => tracing::info!(
            train = %d.train_id,
            route = %d.route_id,
            status = ?d.status,
            delay_min = d.delay().map(|x| x.num_minutes()),
            "departure update"
        ),
        OpsEvent::IncidentCreated(i) => tracing::warn!(
            train = %i.train_id,
            severity = ?i.severity,
            description = %i.description,
            "incident reported"
        ),
        OpsEvent::IncidentUpdated(i) => tracing::info!(
            train = %i.train_id,
            status = i.status.as_deref().unwrap_or("unknown"),
            resolved = i.is_resolved(),
            "incident updated"
        ),
        OpsEvent::StandbyDeployed(s) => tracing::info!(
            standby = %s.standby_train_id,
            replaces = %s.replacement_for_service_id,
            "standby deployed"
        ),
        OpsEvent::SystemStatus(s) => tracing::info!(
            services = s.total_services,
            on_time = s.on_time_services,
            on_time_ratio = s.on_time_ratio(),
            incidents = s.active_incidents,
            status = %s.system_status,
            "system status"
        ),
    }
}
