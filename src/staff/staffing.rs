//! Dynamic sizing of the admin pool

use super::{AdminRoster, StageContext};
use crate::clinic::StaffingThresholds;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one staffing evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffingDecision {
    /// Activate one more admin
    ScaleUp,
    /// Deactivate one admin
    ScaleDown,
    /// Leave the pool as it is
    Hold,
}

/// Pure staffing rule: thresholds plus cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffingPolicy {
    thresholds: StaffingThresholds,
    cooldown: Duration,
}

impl StaffingPolicy {
    /// Create a policy; `cooldown` is real time
    pub fn new(thresholds: StaffingThresholds, cooldown: Duration) -> Self {
        Self {
            thresholds,
            cooldown,
        }
    }

    /// Minimum real time between two changes
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decide on intake depth alone, ignoring the cooldown.
    ///
    /// Never proposes leaving `[1, max]`.
    pub fn decide(&self, intake_depth: usize, active: usize, max: usize) -> StaffingDecision {
        if intake_depth > self.thresholds.scale_up_above && active < max {
            StaffingDecision::ScaleUp
        } else if intake_depth < self.thresholds.scale_down_below && active > 1 {
            StaffingDecision::ScaleDown
        } else {
            StaffingDecision::Hold
        }
    }

    /// Decide, holding while the last change is younger than the cooldown
    pub fn evaluate(
        &self,
        since_last_change: Duration,
        intake_depth: usize,
        active: usize,
        max: usize,
    ) -> StaffingDecision {
        if since_last_change < self.cooldown {
            return StaffingDecision::Hold;
        }
        self.decide(intake_depth, active, max)
    }

    /// Whether a total backlog counts as an overload
    pub fn is_overloaded(&self, backlog: usize) -> bool {
        backlog > self.thresholds.overload_above
    }

    /// Active count after applying `decision`
    pub fn apply(decision: StaffingDecision, active: usize) -> usize {
        match decision {
            StaffingDecision::ScaleUp => active + 1,
            StaffingDecision::ScaleDown => active.saturating_sub(1),
            StaffingDecision::Hold => active,
        }
    }
}

/// Periodically resizes the admin pool through the [`AdminRoster`]
#[derive(Debug)]
pub struct StaffingController {
    policy: StaffingPolicy,
    roster: Arc<AdminRoster>,
    ctx: StageContext,
    last_change: Instant,
}

impl StaffingController {
    /// Create a controller whose cooldown starts at `started`
    pub fn new(
        policy: StaffingPolicy,
        roster: Arc<AdminRoster>,
        ctx: StageContext,
        started: Instant,
    ) -> Self {
        Self {
            policy,
            roster,
            ctx,
            last_change: started,
        }
    }

    /// Run one control cycle at `now`
    pub fn step(&mut self, now: Instant) -> StaffingDecision {
        let backlog = self.ctx.facility.backlog();
        if self.policy.is_overloaded(backlog) {
            self.ctx.metrics.record_overload();
            log::warn!("clinic overloaded: {} patients waiting", backlog);
            #[cfg(feature = "tracing")]
            crate::tracing::events::record_overload(backlog);
        }

        let intake_depth = self.ctx.facility.intake().depth();
        let active = self.roster.active_count();
        let decision = self.policy.evaluate(
            now.saturating_duration_since(self.last_change),
            intake_depth,
            active,
            self.roster.max(),
        );

        if decision != StaffingDecision::Hold {
            let resized = self
                .roster
                .set_active(StaffingPolicy::apply(decision, active));
            self.last_change = now;
            self.ctx.metrics.record_staffing_change();
            log::info!(
                "admin pool {} from {} to {} (intake depth {})",
                if decision == StaffingDecision::ScaleUp {
                    "grown"
                } else {
                    "shrunk"
                },
                active,
                resized,
                intake_depth
            );
            #[cfg(feature = "tracing")]
            crate::tracing::events::record_staffing_change(active, resized, intake_depth);
        }

        decision
    }

    /// Evaluate every staffing period until the run is cancelled
    pub fn run(mut self) {
        #[cfg(feature = "tracing")]
        let span = crate::tracing::events::worker_span("clinic-staffing");
        #[cfg(feature = "tracing")]
        let _guard = span.enter();

        log::debug!(
            "staffing controller started (cooldown {:?})",
            self.policy.cooldown()
        );

        let period = f64::from(self.ctx.timings.staffing_period_secs);
        while self.ctx.clock.wait(period, &self.ctx.token) {
            self.step(Instant::now());
        }

        log::debug!("staffing controller stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Category, Patient};
    use crate::staff::test_support::fast_context;
    use crate::staff::{StaffRole, WorkerState};

    fn policy(cooldown: Duration) -> StaffingPolicy {
        StaffingPolicy::new(StaffingThresholds::default(), cooldown)
    }

    fn roster(max: usize, initial: usize) -> Arc<AdminRoster> {
        let slots = (1..=max)
            .map(|id| Arc::new(WorkerState::new(id, StaffRole::Admin, false)))
            .collect();
        Arc::new(AdminRoster::new(slots, initial))
    }

    fn fill_intake(ctx: &StageContext, count: u64) {
        for id in 1..=count {
            ctx.facility
                .intake()
                .enqueue_fifo(Patient::new(id, Category::General, 3))
                .unwrap();
        }
    }

    #[test]
    fn test_decide_thresholds() {
        let policy = policy(Duration::ZERO);
        assert_eq!(policy.decide(16, 2, 4), StaffingDecision::ScaleUp);
        assert_eq!(policy.decide(15, 2, 4), StaffingDecision::Hold);
        assert_eq!(policy.decide(5, 2, 4), StaffingDecision::Hold);
        assert_eq!(policy.decide(4, 2, 4), StaffingDecision::ScaleDown);
    }

    #[test]
    fn test_decide_respects_bounds() {
        let policy = policy(Duration::ZERO);
        assert_eq!(policy.decide(100, 4, 4), StaffingDecision::Hold);
        assert_eq!(policy.decide(0, 1, 4), StaffingDecision::Hold);
    }

    #[test]
    fn test_cooldown_holds() {
        let policy = policy(Duration::from_secs(120));
        assert_eq!(
            policy.evaluate(Duration::from_secs(119), 100, 2, 4),
            StaffingDecision::Hold
        );
        assert_eq!(
            policy.evaluate(Duration::from_secs(120), 100, 2, 4),
            StaffingDecision::ScaleUp
        );
    }

    #[test]
    fn test_overload_threshold() {
        let policy = policy(Duration::ZERO);
        assert!(!policy.is_overloaded(50));
        assert!(policy.is_overloaded(51));
    }

    #[test]
    fn test_step_scales_up_then_waits_for_cooldown() {
        let ctx = fast_context(100);
        fill_intake(&ctx, 20);
        let roster = roster(4, 2);
        let started = Instant::now();
        let mut controller = StaffingController::new(
            policy(Duration::from_secs(60)),
            Arc::clone(&roster),
            ctx.clone(),
            started,
        );

        // Inside the initial cooldown
        assert_eq!(controller.step(started), StaffingDecision::Hold);
        assert_eq!(roster.active_count(), 2);

        let later = started + Duration::from_secs(61);
        assert_eq!(controller.step(later), StaffingDecision::ScaleUp);
        assert_eq!(roster.active_count(), 3);

        assert_eq!(
            controller.step(later + Duration::from_secs(30)),
            StaffingDecision::Hold
        );
        assert_eq!(
            controller.step(later + Duration::from_secs(61)),
            StaffingDecision::ScaleUp
        );
        assert_eq!(roster.active_count(), 4);
        assert_eq!(
            controller.step(later + Duration::from_secs(200)),
            StaffingDecision::Hold
        );
        assert_eq!(ctx.metrics.snapshot().staffing_changes, 2);
    }

    #[test]
    fn test_step_scales_down_to_one() {
        let ctx = fast_context(100);
        let roster = roster(3, 3);
        let started = Instant::now();
        let mut controller =
            StaffingController::new(policy(Duration::ZERO), Arc::clone(&roster), ctx, started);

        assert_eq!(controller.step(started), StaffingDecision::ScaleDown);
        assert_eq!(controller.step(started), StaffingDecision::ScaleDown);
        assert_eq!(controller.step(started), StaffingDecision::Hold);
        assert_eq!(roster.active_count(), 1);
        assert!(roster.slots()[0].is_active());
        assert!(!roster.slots()[1].is_active());
    }

    #[test]
    fn test_step_counts_overload() {
        let ctx = fast_context(100);
        fill_intake(&ctx, 51);
        let roster = roster(2, 2);
        let mut controller = StaffingController::new(
            policy(Duration::from_secs(3600)),
            roster,
            ctx.clone(),
            Instant::now(),
        );

        controller.step(Instant::now());
        controller.step(Instant::now());
        assert_eq!(ctx.metrics.snapshot().overload_events, 2);
        assert_eq!(ctx.metrics.snapshot().staffing_changes, 0);
    }
}
