//! The threads that move patients through the clinic.
//!
//! - [`Generator`] creates arrivals on the intake queue
//! - [`Classifier`] (admin) triages intake into service queues, gated by the
//!   [`AdminRoster`]
//! - [`ServiceAgent`] serves one service queue, applying reneging on pickup
//! - [`StaffingController`] resizes the active admin pool
//!
//! Every loop polls with the configured interval and treats a cancelled
//! [`CancellationToken`] as the signal to exit.

mod classifier;
mod generator;
mod roster;
mod service;
mod staffing;
mod worker;

pub use classifier::Classifier;
pub use generator::Generator;
pub use roster::AdminRoster;
pub use service::ServiceAgent;
pub use staffing::{StaffingController, StaffingDecision, StaffingPolicy};
pub use worker::{StaffRole, WorkerSnapshot, WorkerState, WorkerThread};

use crate::clinic::{ClinicMetrics, Facility, SimTimings};
use crate::core::{CancellationToken, SimClock};
use std::sync::Arc;
use std::time::Duration;

/// Everything a clinic thread shares with the rest of the run
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Queues
    pub facility: Arc<Facility>,
    /// Run-wide counters
    pub metrics: Arc<ClinicMetrics>,
    /// Simulated time
    pub clock: SimClock,
    /// Shutdown signal
    pub token: CancellationToken,
    /// Activity durations
    pub timings: SimTimings,
    /// How often idle loops re-check their gate and the token
    pub poll_interval: Duration,
}

impl StageContext {
    /// Whether the run is still going
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// Random stream for one thread.
///
/// Seeded runs give every thread its own reproducible stream at
/// `seed + stream`; unseeded runs draw from entropy.
pub fn worker_rng(seed: Option<u64>, stream: u64) -> fastrand::Rng {
    match seed {
        Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(stream)),
        None => fastrand::Rng::new(),
    }
}
