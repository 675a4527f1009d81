//! Time compression
//!
//! Every delay in the clinic is expressed in simulated seconds and divided
//! by a speed factor that stays fixed for the whole run.

use crate::core::cancellation::CancellationToken;
use crate::core::error::{ClinicError, Result};
use std::time::{Duration, Instant};

/// Shortest real suspension for a positive simulated delay
pub const MIN_RESOLUTION: Duration = Duration::from_micros(1);

/// Converts a simulated delay into the real duration to suspend for.
///
/// Non-positive delays map to zero. Positive delays never fall below
/// [`MIN_RESOLUTION`], however large the speed factor.
pub fn scaled_duration(simulated_secs: f64, speed_factor: f64) -> Duration {
    if simulated_secs <= 0.0 || !simulated_secs.is_finite() {
        return Duration::ZERO;
    }
    let real = Duration::try_from_secs_f64(simulated_secs / speed_factor).unwrap_or(Duration::MAX);
    real.max(MIN_RESOLUTION)
}

/// Suspends the calling thread for `simulated_secs / speed_factor` real seconds.
pub fn scaled_wait(simulated_secs: f64, speed_factor: f64) {
    let real = scaled_duration(simulated_secs, speed_factor);
    if !real.is_zero() {
        std::thread::sleep(real);
    }
}

/// Run-wide clock mapping real time onto simulated time
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    speed_factor: f64,
    started: Instant,
}

impl SimClock {
    /// Create a clock starting now.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `speed_factor` is finite and positive.
    pub fn new(speed_factor: f64) -> Result<Self> {
        if !speed_factor.is_finite() || speed_factor <= 0.0 {
            return Err(ClinicError::invalid_config(
                "speed_factor",
                format!("must be a finite number greater than 0, got {}", speed_factor),
            ));
        }
        Ok(Self {
            speed_factor,
            started: Instant::now(),
        })
    }

    /// The fixed speed factor of this run
    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    /// Instant the run started
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Real duration corresponding to a simulated delay
    pub fn scaled(&self, simulated_secs: f64) -> Duration {
        scaled_duration(simulated_secs, self.speed_factor)
    }

    /// Simulated seconds corresponding to a real duration
    pub fn to_simulated(&self, real: Duration) -> f64 {
        real.as_secs_f64() * self.speed_factor
    }

    /// Real time since the run started
    pub fn elapsed_real(&self) -> Duration {
        self.started.elapsed()
    }

    /// Simulated seconds since the run started
    pub fn elapsed_simulated(&self) -> f64 {
        self.to_simulated(self.elapsed_real())
    }

    /// Suspends for a simulated delay unless the run is cancelled first.
    ///
    /// Returns `true` if the full delay elapsed, `false` if cancellation cut
    /// it short.
    pub fn wait(&self, simulated_secs: f64, token: &CancellationToken) -> bool {
        let real = self.scaled(simulated_secs);
        if real.is_zero() {
            return !token.is_cancelled();
        }
        !token.wait_timeout(real)
    }
}
