//! Convenient re-exports for common types and traits

pub use crate::clinic::{
    Clinic, ClinicConfig, ClinicSnapshot, DelayRange, MetricsSnapshot, QueueSnapshot,
    SimTimings, StaffingThresholds,
};
pub use crate::core::{
    AbandonmentPolicy, AbandonmentTier, CancellationToken, Category, ClinicError, Patient,
    Result, SimClock, Specialty,
};
pub use crate::queue::{Dequeue, Prioritized, PriorityQueue};
pub use crate::staff::{StaffRole, WorkerSnapshot};
