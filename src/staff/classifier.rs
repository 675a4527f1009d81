//! Intake classification

use super::{AdminRoster, StageContext, WorkerState};
use crate::core::Patient;
use crate::queue::Dequeue;
use std::sync::Arc;
use std::time::Instant;

/// Admin worker bound to one roster slot.
///
/// Takes patients off intake in arrival order, spends the classification
/// time on each and routes it to its service queue with priority ordering.
/// Only classifies while its slot is active.
#[derive(Debug)]
pub struct Classifier {
    slot: usize,
    state: Arc<WorkerState>,
    roster: Arc<AdminRoster>,
    ctx: StageContext,
    rng: fastrand::Rng,
}

impl Classifier {
    /// Create the classifier for roster slot `slot` (0-based)
    pub fn new(
        slot: usize,
        roster: Arc<AdminRoster>,
        ctx: StageContext,
        rng: fastrand::Rng,
    ) -> Option<Self> {
        let state = Arc::clone(roster.slots().get(slot)?);
        Some(Self {
            slot,
            state,
            roster,
            ctx,
            rng,
        })
    }

    /// Classify until the run is cancelled
    pub fn run(mut self) {
        #[cfg(feature = "tracing")]
        let span = crate::tracing::events::worker_span(&self.state.thread_name());
        #[cfg(feature = "tracing")]
        let _guard = span.enter();

        log::debug!("admin {} started", self.state.id());
        let facility = Arc::clone(&self.ctx.facility);
        let metrics = Arc::clone(&self.ctx.metrics);
        let intake = facility.intake();

        while self.ctx.is_running() {
            if !self
                .roster
                .wait_until_active(self.slot, self.ctx.poll_interval)
            {
                continue;
            }

            match intake.wait_for_item(self.ctx.poll_interval) {
                Dequeue::Ready(()) => {
                    let taken = {
                        let _ledger = metrics.transition();
                        let patient = intake.try_dequeue();
                        if patient.is_some() {
                            metrics.record_classification_started();
                        }
                        patient
                    };
                    if let Some(patient) = taken {
                        self.classify(patient);
                    }
                }
                Dequeue::TimedOut => continue,
                Dequeue::Closed => break,
            }
        }

        log::debug!(
            "admin {} stopping after {} classifications",
            self.state.id(),
            self.state.handled()
        );
    }

    fn classify(&mut self, mut patient: Patient) {
        self.state.set_busy();
        let started = Instant::now();

        let delay = self.ctx.timings.classification.sample(&mut self.rng);
        if !self.ctx.clock.wait(delay, &self.ctx.token) {
            {
                let _ledger = self.ctx.metrics.transition();
                self.ctx.metrics.record_classification_interrupted();
            }
            self.state.set_idle(started.elapsed());
            log::debug!(
                "admin {}: classification of patient {} interrupted",
                self.state.id(),
                patient.id()
            );
            return;
        }

        patient.mark_classified(Instant::now());
        let id = patient.id();
        let destination = self.ctx.facility.destination(patient.category());
        let routed = {
            let _ledger = self.ctx.metrics.transition();
            self.ctx.metrics.record_classified();
            destination.enqueue(patient)
        };

        match routed {
            Ok(()) => {
                log::trace!(
                    "admin {}: patient {} routed to {}",
                    self.state.id(),
                    id,
                    destination.name()
                );
                #[cfg(feature = "tracing")]
                crate::tracing::events::record_classified(
                    self.state.id(),
                    id,
                    destination.name(),
                );
            }
            Err(full) => {
                log::warn!("admin {}: patient {} dropped: {}", self.state.id(), id, full);
                #[cfg(feature = "tracing")]
                crate::tracing::events::record_dropped(full.queue(), id);
            }
        }

        self.state.increment_handled();
        self.state.set_idle(started.elapsed());
    }
}
