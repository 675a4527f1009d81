//! Patient arrivals

use super::StageContext;
use crate::core::{Category, Patient, Specialty, HIGHEST_PRIORITY, LOWEST_PRIORITY};
use std::sync::Arc;

/// Percentage of arrivals routed to the general practitioners
const GENERAL_SHARE: u32 = 70;
/// Cumulative percentage including the secondary (nursing) line
const SECONDARY_SHARE: u32 = 85;

/// Creates patients at random intervals and queues them for intake
#[derive(Debug)]
pub struct Generator {
    ctx: StageContext,
    rng: fastrand::Rng,
}

impl Generator {
    /// Create a generator drawing from `rng`
    pub fn new(ctx: StageContext, rng: fastrand::Rng) -> Self {
        Self { ctx, rng }
    }

    /// Draw the category of a new arrival: 70% general, 15% secondary and
    /// 15% split evenly across the specialties
    pub fn draw_category(rng: &mut fastrand::Rng) -> Category {
        let roll = rng.u32(0..100);
        if roll < GENERAL_SHARE {
            Category::General
        } else if roll < SECONDARY_SHARE {
            Category::Secondary
        } else {
            Category::Specialized(Specialty::ALL[rng.usize(..Specialty::ALL.len())])
        }
    }

    /// Create the next patient with a fresh id
    pub fn next_patient(&mut self) -> Patient {
        let id = self.ctx.metrics.next_patient_id();
        let priority = self.rng.u8(HIGHEST_PRIORITY..=LOWEST_PRIORITY);
        let category = Self::draw_category(&mut self.rng);
        Patient::new(id, category, priority)
    }

    /// Generate arrivals until the run is cancelled
    pub fn run(mut self) {
        #[cfg(feature = "tracing")]
        let span = crate::tracing::events::worker_span("clinic-generator");
        #[cfg(feature = "tracing")]
        let _guard = span.enter();

        log::debug!("generator started");
        let facility = Arc::clone(&self.ctx.facility);
        let metrics = Arc::clone(&self.ctx.metrics);
        let intake = facility.intake();

        loop {
            let gap = self.ctx.timings.arrival_interval.sample(&mut self.rng);
            if !self.ctx.clock.wait(gap, &self.ctx.token) {
                break;
            }

            let ledger = metrics.transition();
            let patient = self.next_patient();
            let (id, priority, category) = (patient.id(), patient.priority(), patient.category());
            let queued = intake.enqueue_fifo(patient);
            drop(ledger);

            match queued {
                Ok(()) => {
                    log::trace!(
                        "patient {} arrived (priority {}, {})",
                        id,
                        priority,
                        category
                    );
                    #[cfg(feature = "tracing")]
                    crate::tracing::events::record_arrival(id, priority, intake.depth());
                }
                Err(full) => {
                    log::warn!("patient {} turned away: {}", id, full);
                    #[cfg(feature = "tracing")]
                    crate::tracing::events::record_dropped(full.queue(), id);
                }
            }
        }

        log::debug!(
            "generator stopping after {} arrivals",
            metrics.generated()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CancellationReason;
    use crate::staff::test_support::fast_context;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_category_mix() {
        let mut rng = fastrand::Rng::with_seed(9);
        let trials = 20_000;
        let mut general = 0;
        let mut secondary = 0;
        let mut specialized = [0usize; 4];
        for _ in 0..trials {
            match Generator::draw_category(&mut rng) {
                Category::General => general += 1,
                Category::Secondary => secondary += 1,
                Category::Specialized(s) => specialized[s.index()] += 1,
            }
        }

        let share = |n: usize| n as f64 / trials as f64;
        assert!((0.67..0.73).contains(&share(general)));
        assert!((0.13..0.17).contains(&share(secondary)));
        for count in specialized {
            assert!(count > 0);
        }
    }

    #[test]
    fn test_ids_increase_and_priorities_in_range() {
        let mut generator = Generator::new(fast_context(8), fastrand::Rng::with_seed(1));
        let patients: Vec<Patient> = (0..50).map(|_| generator.next_patient()).collect();

        assert!(patients.windows(2).all(|w| w[0].id() < w[1].id()));
        assert_eq!(patients[0].id(), 1);
        assert!(patients
            .iter()
            .all(|p| (HIGHEST_PRIORITY..=LOWEST_PRIORITY).contains(&p.priority())));
    }

    #[test]
    fn test_full_intake_counts_drops() {
        let ctx = fast_context(3);
        let generator = Generator::new(ctx.clone(), fastrand::Rng::with_seed(5));
        let handle = thread::spawn(move || generator.run());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while ctx.facility.intake().dropped() == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        ctx.token.cancel_with_reason(CancellationReason::Shutdown);
        handle.join().unwrap();

        let intake = ctx.facility.intake();
        assert_eq!(intake.depth(), 3);
        assert!(intake.dropped() > 0);
        assert_eq!(
            ctx.metrics.generated(),
            intake.depth() as u64 + intake.dropped()
        );
    }
}
