//! Configuration for a clinic run.
//!
//! [`ClinicConfig`] is built in code with `with_*` methods or loaded from
//! JSON; missing JSON fields fall back to the defaults, which reproduce the
//! reference clinic (4 admin slots with 2 active, 4 general practitioners,
//! 2 nurses, 2 specialists, real-time speed).

use crate::core::{AbandonmentPolicy, ClinicError, Result, Specialty};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Inclusive range of simulated seconds a delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Shortest delay in simulated seconds
    pub min_secs: u32,
    /// Longest delay in simulated seconds
    pub max_secs: u32,
}

impl DelayRange {
    /// Create a range
    pub const fn new(min_secs: u32, max_secs: u32) -> Self {
        Self { min_secs, max_secs }
    }

    /// Draw a uniformly distributed delay in simulated seconds
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        f64::from(rng.u32(self.min_secs..=self.max_secs))
    }

    fn validate(&self, parameter: &str) -> Result<()> {
        if self.min_secs > self.max_secs {
            return Err(ClinicError::invalid_config(
                parameter,
                format!(
                    "min_secs ({}) must not exceed max_secs ({})",
                    self.min_secs, self.max_secs
                ),
            ));
        }
        Ok(())
    }
}

/// Simulated durations of every timed activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimTimings {
    /// Gap between consecutive arrivals
    pub arrival_interval: DelayRange,
    /// Intake classification time
    pub classification: DelayRange,
    /// Service time
    pub service: DelayRange,
    /// Agent recovery between patients
    pub recovery: DelayRange,
    /// Period of the staffing controller
    pub staffing_period_secs: u32,
    /// Minimum simulated time between two staffing changes
    pub staffing_cooldown_secs: u32,
}

impl Default for SimTimings {
    fn default() -> Self {
        Self {
            arrival_interval: DelayRange::new(5, 45),
            classification: DelayRange::new(60, 180),
            service: DelayRange::new(480, 720),
            recovery: DelayRange::new(60, 120),
            staffing_period_secs: 180,
            staffing_cooldown_secs: 120,
        }
    }
}

/// Queue-depth thresholds driving the staffing controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffingThresholds {
    /// Activate one more admin when intake depth is above this
    pub scale_up_above: usize,
    /// Deactivate one admin when intake depth is below this
    pub scale_down_below: usize,
    /// Report overload when total backlog is above this
    pub overload_above: usize,
}

impl Default for StaffingThresholds {
    fn default() -> Self {
        Self {
            scale_up_above: 15,
            scale_down_below: 5,
            overload_above: 50,
        }
    }
}

/// Configuration for a clinic run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// Number of admin (classifier) slots; the staffing ceiling
    pub max_admins: usize,
    /// Admin slots active at start
    pub initial_admins: usize,
    /// General practitioners; at least one
    pub general_agents: usize,
    /// Nurses serving the secondary queue; at least one
    pub secondary_agents: usize,
    /// Specialists; may be zero, leaving specialty queues unserved
    pub specialist_agents: usize,
    /// Explicit specialty per specialist, repeats allowed.
    ///
    /// When absent, specialists are spread round-robin over
    /// [`Specialty::ALL`] so every specialty is covered once there are four
    /// or more. Drawing each specialty at random instead can leave a
    /// specialty unstaffed; list the draw here to get that behaviour.
    pub specialties: Option<Vec<Specialty>>,
    /// Simulated seconds per real second
    pub speed_factor: f64,
    /// Capacity of the intake queue
    pub intake_capacity: usize,
    /// Capacity of each post-classification queue
    pub service_capacity: usize,
    /// How often idle workers re-check their gate and the shutdown flag
    pub poll_interval_ms: u64,
    /// How long shutdown waits for workers to exit
    pub grace_period_ms: u64,
    /// Seed for reproducible random streams
    pub seed: Option<u64>,
    /// Simulated activity durations
    pub timings: SimTimings,
    /// Staffing controller thresholds
    pub staffing: StaffingThresholds,
    /// Reneging step function
    pub abandonment: AbandonmentPolicy,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            max_admins: 4,
            initial_admins: 2,
            general_agents: 4,
            secondary_agents: 2,
            specialist_agents: 2,
            specialties: None,
            speed_factor: 1.0,
            intake_capacity: 1000,
            service_capacity: 1000,
            poll_interval_ms: 100,
            grace_period_ms: 2000,
            seed: None,
            timings: SimTimings::default(),
            staffing: StaffingThresholds::default(),
            abandonment: AbandonmentPolicy::default(),
        }
    }
}

impl ClinicConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration; absent fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Set the admin pool size and how many start active
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_admins(mut self, max_admins: usize, initial_admins: usize) -> Self {
        self.max_admins = max_admins;
        self.initial_admins = initial_admins;
        self
    }

    /// Set the number of agents per service line
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_agents(mut self, general: usize, secondary: usize, specialists: usize) -> Self {
        self.general_agents = general;
        self.secondary_agents = secondary;
        self.specialist_agents = specialists;
        self
    }

    /// Assign one specialist per listed specialty
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_specialties(mut self, specialties: Vec<Specialty>) -> Self {
        self.specialist_agents = specialties.len();
        self.specialties = Some(specialties);
        self
    }

    /// Set the speed factor
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_speed_factor(mut self, speed_factor: f64) -> Self {
        self.speed_factor = speed_factor;
        self
    }

    /// Set intake and per-service queue capacities
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_capacities(mut self, intake: usize, service: usize) -> Self {
        self.intake_capacity = intake;
        self.service_capacity = service;
        self
    }

    /// Set the worker poll interval
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_to_millis(interval);
        self
    }

    /// Set the shutdown grace period
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period_ms = duration_to_millis(grace);
        self
    }

    /// Seed every random stream
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the activity timings
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_timings(mut self, timings: SimTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Replace the staffing thresholds
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_staffing(mut self, staffing: StaffingThresholds) -> Self {
        self.staffing = staffing;
        self
    }

    /// Replace the abandonment policy
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_abandonment(mut self, policy: AbandonmentPolicy) -> Self {
        self.abandonment = policy;
        self
    }

    /// Worker poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Shutdown grace period
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Specialty served by each specialist, in spawn order
    pub fn specialist_assignments(&self) -> Vec<Specialty> {
        match &self.specialties {
            Some(specialties) => specialties.clone(),
            None => (0..self.specialist_agents)
                .map(|i| Specialty::ALL[i % Specialty::ALL.len()])
                .collect(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_admins == 0 {
            return Err(ClinicError::invalid_config(
                "max_admins",
                "At least one admin slot is required",
            ));
        }
        if self.initial_admins == 0 || self.initial_admins > self.max_admins {
            return Err(ClinicError::invalid_config(
                "initial_admins",
                format!("must be within [1, {}]", self.max_admins),
            ));
        }
        if self.general_agents == 0 {
            return Err(ClinicError::invalid_config(
                "general_agents",
                "At least one general practitioner is required",
            ));
        }
        if self.secondary_agents == 0 {
            return Err(ClinicError::invalid_config(
                "secondary_agents",
                "At least one nurse is required",
            ));
        }
        if let Some(specialties) = &self.specialties {
            if specialties.len() != self.specialist_agents {
                return Err(ClinicError::invalid_config(
                    "specialties",
                    format!(
                        "{} specialties listed for {} specialists",
                        specialties.len(),
                        self.specialist_agents
                    ),
                ));
            }
        }
        if !self.speed_factor.is_finite() || self.speed_factor <= 0.0 {
            return Err(ClinicError::invalid_config(
                "speed_factor",
                "must be a finite number greater than 0",
            ));
        }
        if self.intake_capacity == 0 {
            return Err(ClinicError::invalid_config(
                "intake_capacity",
                "must be greater than 0",
            ));
        }
        if self.service_capacity == 0 {
            return Err(ClinicError::invalid_config(
                "service_capacity",
                "must be greater than 0",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClinicError::invalid_config(
                "poll_interval_ms",
                "must be greater than 0",
            ));
        }
        if self.staffing.scale_down_below > self.staffing.scale_up_above {
            return Err(ClinicError::invalid_config(
                "staffing",
                "scale_down_below must not exceed scale_up_above",
            ));
        }
        self.timings
            .arrival_interval
            .validate("timings.arrival_interval")?;
        self.timings
            .classification
            .validate("timings.classification")?;
        self.timings.service.validate("timings.service")?;
        self.timings.recovery.validate("timings.recovery")?;
        if self.timings.staffing_period_secs == 0 {
            return Err(ClinicError::invalid_config(
                "timings.staffing_period_secs",
                "must be greater than 0",
            ));
        }
        self.abandonment.validate()
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
