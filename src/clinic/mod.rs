//! The clinic: configuration, queues, counters and the run engine

mod config;
mod engine;
mod facility;
mod metrics;
mod snapshot;

pub use config::{ClinicConfig, DelayRange, SimTimings, StaffingThresholds};
pub use engine::Clinic;
pub use facility::{Facility, QueueSnapshot};
pub use metrics::{ClinicMetrics, MetricsSnapshot};
pub use snapshot::ClinicSnapshot;
