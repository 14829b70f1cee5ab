//! Domain layer: rail-operations records carried by the event stream.
//!
//! The shapes mirror the dashboard API's JSON (camelCase). Each record
//! keeps unrecognized fields in an `extra` map so nothing the server sends
//! is lost when a consumer re-serializes it.

pub mod departure;
pub mod incident;
pub mod ops_event;
pub mod snapshot;
pub mod standby;

pub use departure::{DepartureStatus, ServiceDeparture};
pub use incident::{Incident, Severity};
pub use ops_event::OpsEvent;
pub use snapshot::OperationsSnapshot;
pub use standby::StandbyDeployment;
