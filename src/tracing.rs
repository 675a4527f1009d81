//! Structured tracing events for clinic runs.
//!
//! With the `tracing` feature enabled every stage emits events whose fields
//! follow the `counter.*` / `gauge.*` / `histogram.*` naming convention, so a
//! subscriber can turn them into metrics. Without the feature this module is
//! empty and the stages only log through the `log` facade.
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! let clinic = Clinic::start(ClinicConfig::default())?;
//! ```

/// Event recording functions, one per observable step of a patient's visit
#[cfg(feature = "tracing")]
pub mod events {
    use std::time::Duration;

    /// Span covering the lifetime of one clinic thread
    #[inline]
    pub fn worker_span(thread_name: &str) -> tracing::Span {
        tracing::debug_span!("clinic_worker", thread = thread_name)
    }

    /// Records a new arrival on the intake queue.
    #[inline]
    pub fn record_arrival(patient_id: u64, priority: u8, intake_depth: usize) {
        tracing::trace!(
            counter.patients_generated = 1,
            gauge.intake_depth = intake_depth as i64,
            patient_id = patient_id,
            priority = priority,
            "patient arrived"
        );
    }

    /// Records a patient rejected by a full queue.
    #[inline]
    pub fn record_dropped(queue: &str, patient_id: u64) {
        tracing::warn!(
            counter.patients_dropped = 1,
            queue = queue,
            patient_id = patient_id,
            "queue full, patient dropped"
        );
    }

    /// Records a completed classification.
    #[inline]
    pub fn record_classified(admin_id: usize, patient_id: u64, category: &str) {
        tracing::trace!(
            counter.patients_classified = 1,
            admin_id = admin_id,
            patient_id = patient_id,
            category = category,
            "patient classified"
        );
    }

    /// Records a patient leaving before service.
    #[inline]
    pub fn record_abandoned(queue: &str, patient_id: u64, waited_sim_secs: f64) {
        tracing::trace!(
            counter.patients_abandoned = 1,
            histogram.abandoned_wait_secs = waited_sim_secs,
            queue = queue,
            patient_id = patient_id,
            "patient abandoned"
        );
    }

    /// Records an agent starting service.
    #[inline]
    pub fn record_service_started(queue: &str, patient_id: u64, waited: Duration) {
        tracing::trace!(
            gauge.staff_busy = 1,
            histogram.wait_ms = waited.as_millis() as u64,
            queue = queue,
            patient_id = patient_id,
            "service started"
        );
    }

    /// Records an agent finishing service.
    #[inline]
    pub fn record_served(queue: &str, patient_id: u64, duration: Duration) {
        tracing::trace!(
            counter.patients_served = 1,
            gauge.staff_busy = -1i64,
            histogram.service_ms = duration.as_millis() as u64,
            queue = queue,
            patient_id = patient_id,
            "service completed"
        );
    }

    /// Records a staffing change.
    #[inline]
    pub fn record_staffing_change(from: usize, to: usize, intake_depth: usize) {
        tracing::info!(
            counter.staffing_changes = 1,
            gauge.active_admins = to as i64,
            previous = from,
            intake_depth = intake_depth,
            "admin pool resized"
        );
    }

    /// Records an overload observation.
    #[inline]
    pub fn record_overload(backlog: usize) {
        tracing::warn!(
            counter.overload_events = 1,
            gauge.backlog = backlog as i64,
            "clinic overloaded"
        );
    }

    /// Records run startup.
    #[inline]
    pub fn record_run_start(run_id: &str, threads: usize, speed_factor: f64) {
        tracing::info!(
            run_id = run_id,
            threads = threads,
            speed_factor = speed_factor,
            "clinic run started"
        );
    }

    /// Records run shutdown.
    #[inline]
    pub fn record_run_shutdown(run_id: &str, generated: u64, served: u64, abandoned: u64) {
        tracing::info!(
            run_id = run_id,
            generated = generated,
            served = served,
            abandoned = abandoned,
            "clinic run shutdown complete"
        );
    }
}
