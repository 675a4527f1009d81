//! Run-wide counters.
//!
//! Every counter is an independent atomic padded to its own cache line. Queue
//! drop counts live on the queues themselves.
//!
//! A patient moving between a queue and the counters (arrival, pickup,
//! routing, completion) does so while holding a [`ClinicMetrics::transition`]
//! guard. Snapshots hold [`ClinicMetrics::freeze`] while reading depths and
//! counters, so the conservation equations hold in every snapshot, not only
//! after shutdown. Transitions share the lock; only snapshots exclude them.

use crossbeam_utils::CachePadded;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of [`ClinicMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Patients created by the generator
    pub generated: u64,
    /// Patients routed to a service queue
    pub classified: u64,
    /// Patients whose service completed
    pub served: u64,
    /// Patients who left before service
    pub abandoned: u64,
    /// Patients held by a classifier right now
    pub in_classification: u64,
    /// Patients held by a service agent right now
    pub in_service: u64,
    /// Classifications cut short by shutdown
    pub interrupted_classification: u64,
    /// Services cut short by shutdown
    pub interrupted_service: u64,
    /// Admin pool size changes
    pub staffing_changes: u64,
    /// Controller cycles that observed an overload
    pub overload_events: u64,
    /// Mean real time from classification to service start, served patients only
    pub avg_wait_secs: f64,
    /// Longest such wait
    pub max_wait_secs: f64,
}

/// Shared atomic counters for one clinic run
#[derive(Debug, Default)]
pub struct ClinicMetrics {
    generated: CachePadded<AtomicU64>,
    classified: CachePadded<AtomicU64>,
    served: CachePadded<AtomicU64>,
    abandoned: CachePadded<AtomicU64>,
    in_classification: CachePadded<AtomicU64>,
    in_service: CachePadded<AtomicU64>,
    interrupted_classification: CachePadded<AtomicU64>,
    interrupted_service: CachePadded<AtomicU64>,
    staffing_changes: CachePadded<AtomicU64>,
    overload_events: CachePadded<AtomicU64>,
    service_starts: CachePadded<AtomicU64>,
    total_wait_us: CachePadded<AtomicU64>,
    max_wait_us: CachePadded<AtomicU64>,
    ledger: RwLock<()>,
}

impl ClinicMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold while a patient changes hands between a queue and the counters.
    ///
    /// Never block or take a second transition guard while holding it.
    pub fn transition(&self) -> RwLockReadGuard<'_, ()> {
        self.ledger.read()
    }

    /// Exclude every transition while a consistent report is read
    pub fn freeze(&self) -> RwLockWriteGuard<'_, ()> {
        self.ledger.write()
    }

    /// Count a new arrival and return its patient id, starting at 1
    pub fn next_patient_id(&self) -> u64 {
        self.generated.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A classifier took a patient off the intake queue
    pub fn record_classification_started(&self) {
        self.in_classification.fetch_add(1, Ordering::Relaxed);
    }

    /// A classifier finished and routed a patient
    pub fn record_classified(&self) {
        self.classified.fetch_add(1, Ordering::Relaxed);
        self.in_classification.fetch_sub(1, Ordering::Relaxed);
    }

    /// Shutdown cut a classification short
    pub fn record_classification_interrupted(&self) {
        self.interrupted_classification
            .fetch_add(1, Ordering::Relaxed);
        self.in_classification.fetch_sub(1, Ordering::Relaxed);
    }

    /// A patient left the service queue without being seen
    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// A service agent started seeing a patient who waited `waited`
    pub fn record_service_started(&self, waited: Duration) {
        self.in_service.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(waited.as_micros()).unwrap_or(u64::MAX);
        self.service_starts.fetch_add(1, Ordering::Relaxed);
        self.total_wait_us.fetch_add(micros, Ordering::Relaxed);
        self.max_wait_us.fetch_max(micros, Ordering::Relaxed);
    }

    /// A service completed
    pub fn record_served(&self) {
        self.served.fetch_add(1, Ordering::Relaxed);
        self.in_service.fetch_sub(1, Ordering::Relaxed);
    }

    /// Shutdown cut a service short
    pub fn record_service_interrupted(&self) {
        self.interrupted_service.fetch_add(1, Ordering::Relaxed);
        self.in_service.fetch_sub(1, Ordering::Relaxed);
    }

    /// The staffing controller changed the active admin count
    pub fn record_staffing_change(&self) {
        self.staffing_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// The staffing controller observed a backlog above threshold
    pub fn record_overload(&self) {
        self.overload_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Patients generated so far
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    /// Patients served so far
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Patients abandoned so far
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// Copy every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let starts = self.service_starts.load(Ordering::Relaxed);
        let total_wait = self.total_wait_us.load(Ordering::Relaxed);
        let avg_wait_secs = if starts > 0 {
            total_wait as f64 / starts as f64 / 1_000_000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            classified: self.classified.load(Ordering::Relaxed),
            served: self.served.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            in_classification: self.in_classification.load(Ordering::Relaxed),
            in_service: self.in_service.load(Ordering::Relaxed),
            interrupted_classification: self.interrupted_classification.load(Ordering::Relaxed),
            interrupted_service: self.interrupted_service.load(Ordering::Relaxed),
            staffing_changes: self.staffing_changes.load(Ordering::Relaxed),
            overload_events: self.overload_events.load(Ordering::Relaxed),
            avg_wait_secs,
            max_wait_secs: self.max_wait_us.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}
