//! # Clinic Simulation
//!
//! A multithreaded, time-scaled simulation of an outpatient clinic: patients
//! arrive, wait for intake classification by a pool of admins, then wait in
//! per-service priority queues for practitioners.
//!
//! ## Features
//!
//! - **Priority Queues**: Bounded, condvar-guarded queues with stable
//!   priority ordering and counted overflow drops
//! - **Scaled Time**: Every simulated delay is divided by a speed factor and
//!   cut short on shutdown
//! - **Reneging**: Patients may abandon the queue after long waits
//! - **Dynamic Staffing**: The admin pool grows and shrinks with intake depth
//! - **Conservation**: Every generated patient is accounted for in every
//!   snapshot, mid-run or after shutdown
//! - **Graceful Shutdown**: One cancellation token reaches every thread
//!
//! ## Quick Start
//!
//! ```rust
//! use clinic_sim::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let config = ClinicConfig::default()
//!     .with_speed_factor(3600.0)
//!     .with_poll_interval(Duration::from_millis(10))
//!     .with_seed(7);
//!
//! let clinic = Clinic::start(config)?;
//! clinic.run_for(600.0)?;
//! clinic.shutdown()?;
//!
//! let snapshot = clinic.snapshot();
//! assert_eq!(snapshot.intake_imbalance(), 0);
//! assert_eq!(snapshot.service_imbalance(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration From JSON
//!
//! ```rust
//! use clinic_sim::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let config = ClinicConfig::from_json_str(
//!     r#"{ "max_admins": 6, "initial_admins": 3, "speed_factor": 60.0 }"#,
//! )?;
//! assert_eq!(config.general_agents, 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Queues On Their Own
//!
//! ```rust
//! use clinic_sim::core::{Category, Patient};
//! use clinic_sim::queue::PriorityQueue;
//!
//! let queue = PriorityQueue::new("general", 5);
//! for (id, priority) in [(1, 3), (2, 1), (3, 4), (4, 1), (5, 5)] {
//!     queue.enqueue(Patient::new(id, Category::General, priority)).unwrap();
//! }
//!
//! let order: Vec<u64> = std::iter::from_fn(|| queue.try_dequeue())
//!     .map(|p| p.id())
//!     .collect();
//! assert_eq!(order, vec![2, 4, 1, 3, 5]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clinic;
pub mod core;
pub mod prelude;
pub mod queue;
pub mod staff;
pub mod tracing;

pub use clinic::{Clinic, ClinicConfig, ClinicSnapshot};
pub use core::{CancellationToken, ClinicError, Result};
