//! Point-in-time report of a clinic run

use super::facility::QueueSnapshot;
use super::metrics::MetricsSnapshot;
use crate::core::Result;
use crate::staff::{StaffRole, WorkerSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Everything observable about a run at one instant.
///
/// `queues` and `totals` are captured together, so both conservation checks
/// are zero in any snapshot, mid-run or after shutdown. `staff` is read
/// racily and may lag by a hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicSnapshot {
    /// Identifier of the run
    pub run_id: Uuid,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Wall-clock time of this snapshot
    pub taken_at: DateTime<Utc>,
    /// Whether the run was still going
    pub running: bool,
    /// Simulated seconds per real second
    pub speed_factor: f64,
    /// Real seconds since start
    pub elapsed_real_secs: f64,
    /// Simulated seconds since start
    pub elapsed_simulated_secs: f64,
    /// Admin slots allowed to classify
    pub active_admins: usize,
    /// Admin slots in total
    pub max_admins: usize,
    /// Every queue, intake first
    pub queues: Vec<QueueSnapshot>,
    /// Every staff slot, admins first
    pub staff: Vec<WorkerSnapshot>,
    /// Run-wide counters
    pub totals: MetricsSnapshot,
}

impl ClinicSnapshot {
    /// The intake queue
    pub fn intake(&self) -> Option<&QueueSnapshot> {
        self.queues.first()
    }

    /// Post-classification queues
    pub fn destinations(&self) -> &[QueueSnapshot] {
        self.queues.get(1..).unwrap_or(&[])
    }

    /// Patients waiting in any queue
    pub fn backlog(&self) -> usize {
        self.queues.iter().map(|q| q.depth).sum()
    }

    /// Share of generated patients who were served, in `[0, 1]`
    pub fn efficiency(&self) -> f64 {
        ratio(self.totals.served, self.totals.generated)
    }

    /// Share of service pickups that ended in abandonment, in `[0, 1]`
    pub fn abandonment_rate(&self) -> f64 {
        ratio(
            self.totals.abandoned,
            self.totals.abandoned + self.totals.served + self.totals.in_service,
        )
    }

    /// Patients turned away by a full intake queue
    pub fn dropped_intake(&self) -> u64 {
        self.intake().map_or(0, |q| q.dropped)
    }

    /// Patients turned away by full service queues
    pub fn dropped_destination(&self) -> u64 {
        self.destinations().iter().map(|q| q.dropped).sum()
    }

    /// Staff of one role
    pub fn staff_in(&self, role: StaffRole) -> impl Iterator<Item = &WorkerSnapshot> {
        self.staff.iter().filter(move |w| w.role == role)
    }

    /// Generated patients not accounted for by intake outcomes.
    ///
    /// Zero for every snapshot taken by [`Clinic::snapshot`](crate::Clinic::snapshot).
    pub fn intake_imbalance(&self) -> i128 {
        let intake_depth = self.intake().map_or(0, |q| q.depth) as i128;
        i128::from(self.totals.generated)
            - i128::from(self.totals.classified)
            - i128::from(self.dropped_intake())
            - intake_depth
            - i128::from(self.totals.in_classification)
            - i128::from(self.totals.interrupted_classification)
    }

    /// Classified patients not accounted for by service outcomes.
    ///
    /// Zero for every snapshot taken by [`Clinic::snapshot`](crate::Clinic::snapshot).
    pub fn service_imbalance(&self) -> i128 {
        let destination_depth: usize = self.destinations().iter().map(|q| q.depth).sum();
        i128::from(self.totals.classified)
            - i128::from(self.totals.served)
            - i128::from(self.totals.abandoned)
            - i128::from(self.dropped_destination())
            - destination_depth as i128
            - i128::from(self.totals.in_service)
            - i128::from(self.totals.interrupted_service)
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl fmt::Display for ClinicSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {} | {:.0}s simulated ({:.1}s real) | {}",
            self.run_id,
            self.elapsed_simulated_secs,
            self.elapsed_real_secs,
            if self.running { "running" } else { "stopped" }
        )?;
        writeln!(
            f,
            "admins {}/{} | backlog {} | generated {} served {} abandoned {} | efficiency {:.1}%",
            self.active_admins,
            self.max_admins,
            self.backlog(),
            self.totals.generated,
            self.totals.served,
            self.totals.abandoned,
            self.efficiency() * 100.0
        )?;
        for queue in &self.queues {
            writeln!(
                f,
                "  {:<12} {:>5}/{:<5} dropped {}",
                queue.name, queue.depth, queue.capacity, queue.dropped
            )?;
        }
        for worker in &self.staff {
            writeln!(
                f,
                "  {:<12} #{:<3} {:<8} handled {}",
                worker.role.to_string(),
                worker.id,
                match (worker.active, worker.busy) {
                    (false, _) => "off",
                    (true, true) => "busy",
                    (true, false) => "idle",
                },
                worker.handled
            )?;
        }
        Ok(())
    }
}
