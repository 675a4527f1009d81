//! Core types shared by every stage of the clinic

pub mod abandonment;
pub mod cancellation;
pub mod clock;
pub mod error;
pub mod patient;

pub use abandonment::{AbandonmentPolicy, AbandonmentTier};
pub use cancellation::{CancellationReason, CancellationToken};
pub use clock::{scaled_duration, scaled_wait, SimClock, MIN_RESOLUTION};
pub use error::{ClinicError, Result};
pub use patient::{Category, Patient, Specialty, HIGHEST_PRIORITY, LOWEST_PRIORITY};
