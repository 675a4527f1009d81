//! Service lines

use super::{StageContext, WorkerState};
use crate::core::{AbandonmentPolicy, Category, Patient};
use crate::queue::{Dequeue, PriorityQueue};
use std::sync::Arc;
use std::time::Instant;

/// A practitioner permanently bound to one service queue
#[derive(Debug)]
pub struct ServiceAgent {
    state: Arc<WorkerState>,
    serves: Category,
    ctx: StageContext,
    policy: AbandonmentPolicy,
    rng: fastrand::Rng,
}

impl ServiceAgent {
    /// Create an agent serving the queue of `serves`
    pub fn new(
        state: Arc<WorkerState>,
        serves: Category,
        ctx: StageContext,
        policy: AbandonmentPolicy,
        rng: fastrand::Rng,
    ) -> Self {
        Self {
            state,
            serves,
            ctx,
            policy,
            rng,
        }
    }

    /// Category whose queue this agent serves
    pub fn serves(&self) -> Category {
        self.serves
    }

    /// Serve patients until the run is cancelled
    pub fn run(mut self) {
        #[cfg(feature = "tracing")]
        let span = crate::tracing::events::worker_span(&self.state.thread_name());
        #[cfg(feature = "tracing")]
        let _guard = span.enter();

        log::debug!("{} started", self.state.thread_name());
        let facility = Arc::clone(&self.ctx.facility);
        let metrics = Arc::clone(&self.ctx.metrics);
        let queue = facility.destination(self.serves);

        while self.ctx.is_running() {
            match queue.wait_for_item(self.ctx.poll_interval) {
                Dequeue::Ready(()) => {
                    // Pickup, the abandonment draw and the service start are
                    // one transition
                    let ledger = metrics.transition();
                    let Some(mut patient) = queue.try_dequeue() else {
                        continue;
                    };
                    if self.renege(queue, &mut patient) {
                        continue;
                    }
                    let started = self.begin_service(queue, &mut patient);
                    drop(ledger);

                    if !self.serve(queue, patient, started) {
                        break;
                    }
                }
                Dequeue::TimedOut => continue,
                Dequeue::Closed => break,
            }
        }

        log::debug!(
            "{} stopping after {} patients",
            self.state.thread_name(),
            self.state.handled()
        );
    }

    /// Apply the abandonment draw; returns whether the patient left
    fn renege(&mut self, queue: &PriorityQueue<Patient>, patient: &mut Patient) -> bool {
        let waited = patient.waiting_since().elapsed();
        if !self
            .policy
            .should_abandon(waited, self.ctx.clock.speed_factor(), &mut self.rng)
        {
            return false;
        }

        patient.mark_abandoned();
        self.ctx.metrics.record_abandoned();
        let waited_sim = self.ctx.clock.to_simulated(waited);
        log::debug!(
            "patient {} left {} after waiting {:.0}s",
            patient.id(),
            queue.name(),
            waited_sim
        );
        #[cfg(feature = "tracing")]
        crate::tracing::events::record_abandoned(queue.name(), patient.id(), waited_sim);
        true
    }

    fn begin_service(&self, queue: &PriorityQueue<Patient>, patient: &mut Patient) -> Instant {
        let started = Instant::now();
        let waited = started.saturating_duration_since(patient.waiting_since());

        patient.mark_service_started(started);
        self.ctx.metrics.record_service_started(waited);
        self.state.set_busy();
        log::trace!(
            "{} seeing patient {} from {} (priority {})",
            self.state.thread_name(),
            patient.id(),
            queue.name(),
            patient.priority()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::events::record_service_started(queue.name(), patient.id(), waited);
        started
    }

    /// Serve one patient and recover; returns `false` if shutdown cut it short
    fn serve(
        &mut self,
        queue: &PriorityQueue<Patient>,
        mut patient: Patient,
        started: Instant,
    ) -> bool {
        let metrics = &self.ctx.metrics;
        let duration = self.ctx.timings.service.sample(&mut self.rng);
        if !self.ctx.clock.wait(duration, &self.ctx.token) {
            {
                let _ledger = metrics.transition();
                metrics.record_service_interrupted();
            }
            self.state.set_idle(started.elapsed());
            log::debug!(
                "{}: service of patient {} interrupted",
                self.state.thread_name(),
                patient.id()
            );
            return false;
        }

        patient.mark_served(Instant::now());
        {
            let _ledger = metrics.transition();
            metrics.record_served();
        }
        self.state.increment_handled();
        self.state.set_idle(started.elapsed());
        log::trace!(
            "{} finished patient {} from {}",
            self.state.thread_name(),
            patient.id(),
            queue.name()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::events::record_served(queue.name(), patient.id(), started.elapsed());

        let recovery = self.ctx.timings.recovery.sample(&mut self.rng);
        self.ctx.clock.wait(recovery, &self.ctx.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AbandonmentTier, CancellationReason, Specialty};
    use crate::staff::test_support::fast_context;
    use crate::staff::StaffRole;
    use std::thread;
    use std::time::Duration;

    fn wait_for(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn classified(id: u64, category: Category, priority: u8) -> Patient {
        let mut patient = Patient::new(id, category, priority);
        patient.mark_classified(Instant::now());
        patient
    }

    #[test]
    fn test_serves_own_queue_only() {
        let ctx = fast_context(8);
        let cardiology = Category::Specialized(Specialty::Cardiology);
        for id in 1..=3 {
            ctx.facility
                .destination(cardiology)
                .enqueue(classified(id, cardiology, 2))
                .unwrap();
        }
        ctx.facility
            .destination(Category::General)
            .enqueue(classified(4, Category::General, 1))
            .unwrap();

        let state = Arc::new(WorkerState::new(
            1,
            StaffRole::Specialist(Specialty::Cardiology),
            true,
        ));
        let agent = ServiceAgent::new(
            Arc::clone(&state),
            cardiology,
            ctx.clone(),
            AbandonmentPolicy::never(),
            fastrand::Rng::with_seed(4),
        );
        assert_eq!(agent.serves(), cardiology);
        let handle = thread::spawn(move || agent.run());

        wait_for(|| state.handled() == 3);
        ctx.token.cancel_with_reason(CancellationReason::Shutdown);
        ctx.facility.close_all();
        handle.join().unwrap();

        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.served, 3);
        assert_eq!(snapshot.in_service, 0);
        assert_eq!(ctx.facility.destination(Category::General).depth(), 1);
    }

    #[test]
    fn test_certain_abandonment_skips_service() {
        let ctx = fast_context(8);
        for id in 1..=5 {
            ctx.facility
                .destination(Category::Secondary)
                .enqueue(classified(id, Category::Secondary, 3))
                .unwrap();
        }

        let policy = AbandonmentPolicy::new(vec![AbandonmentTier::new(0.0, 1.0)]).unwrap();
        let state = Arc::new(WorkerState::new(1, StaffRole::Nurse, true));
        let agent = ServiceAgent::new(
            Arc::clone(&state),
            Category::Secondary,
            ctx.clone(),
            policy,
            fastrand::Rng::with_seed(8),
        );

        // Any positive simulated wait exceeds a 0 s threshold
        thread::sleep(Duration::from_millis(2));
        let handle = thread::spawn(move || agent.run());

        wait_for(|| ctx.metrics.abandoned() == 5);
        ctx.token.cancel_with_reason(CancellationReason::Shutdown);
        ctx.facility.close_all();
        handle.join().unwrap();

        assert_eq!(ctx.metrics.abandoned(), 5);
        assert_eq!(ctx.metrics.served(), 0);
        assert_eq!(state.handled(), 0);
        assert!(ctx.facility.destination(Category::Secondary).is_empty());
    }

    #[test]
    fn test_shutdown_interrupts_service() {
        let mut ctx = fast_context(8);
        ctx.timings.service = crate::clinic::DelayRange::new(100_000, 100_000);
        ctx.facility
            .destination(Category::General)
            .enqueue(classified(1, Category::General, 1))
            .unwrap();

        let state = Arc::new(WorkerState::new(1, StaffRole::GeneralPractitioner, true));
        let agent = ServiceAgent::new(
            Arc::clone(&state),
            Category::General,
            ctx.clone(),
            AbandonmentPolicy::never(),
            fastrand::Rng::new(),
        );
        let handle = thread::spawn(move || agent.run());

        wait_for(|| state.is_busy());
        ctx.token.cancel_with_reason(CancellationReason::Shutdown);
        handle.join().unwrap();

        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.interrupted_service, 1);
        assert_eq!(snapshot.in_service, 0);
        assert_eq!(snapshot.served, 0);
        assert!(!state.is_busy());
    }
}
