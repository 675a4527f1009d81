//! Reneging policy applied when a service agent picks up a waiting patient

use crate::core::error::{ClinicError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One step of the abandonment step function.
///
/// Applies when the simulated wait is strictly greater than `threshold_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbandonmentTier {
    /// Simulated wait (seconds) that must be exceeded
    pub threshold_secs: f64,
    /// Probability of abandoning in this tier, in `[0, 1]`
    pub probability: f64,
}

impl AbandonmentTier {
    /// Create a tier
    pub const fn new(threshold_secs: f64, probability: f64) -> Self {
        Self {
            threshold_secs,
            probability,
        }
    }
}

/// Monotonic step function from simulated wait time to abandonment probability.
///
/// Evaluated once per patient, at pickup. The boundary value itself belongs to
/// the lower tier: with the default tiers a 600 s wait never abandons while a
/// 601 s wait does so with 15% probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbandonmentPolicy {
    /// Ordered by strictly decreasing threshold
    tiers: Vec<AbandonmentTier>,
}

impl Default for AbandonmentPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                AbandonmentTier::new(1200.0, 0.40),
                AbandonmentTier::new(900.0, 0.25),
                AbandonmentTier::new(600.0, 0.15),
            ],
        }
    }
}

impl AbandonmentPolicy {
    /// Build a policy from tiers in any order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for duplicate or non-finite thresholds, or a
    /// probability outside `[0, 1]`.
    pub fn new(mut tiers: Vec<AbandonmentTier>) -> Result<Self> {
        tiers.sort_by(|a, b| b.threshold_secs.total_cmp(&a.threshold_secs));
        let policy = Self { tiers };
        policy.validate()?;
        Ok(policy)
    }

    /// A policy under which nobody ever abandons
    pub fn never() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Tiers, highest threshold first
    pub fn tiers(&self) -> &[AbandonmentTier] {
        &self.tiers
    }

    /// Validate tier ordering and probabilities
    pub fn validate(&self) -> Result<()> {
        for tier in &self.tiers {
            if !tier.threshold_secs.is_finite() || tier.threshold_secs < 0.0 {
                return Err(ClinicError::invalid_config(
                    "abandonment",
                    format!("threshold {} must be finite and non-negative", tier.threshold_secs),
                ));
            }
            if !(0.0..=1.0).contains(&tier.probability) {
                return Err(ClinicError::invalid_config(
                    "abandonment",
                    format!("probability {} must be within [0, 1]", tier.probability),
                ));
            }
        }
        if self
            .tiers
            .windows(2)
            .any(|pair| pair[0].threshold_secs <= pair[1].threshold_secs)
        {
            return Err(ClinicError::invalid_config(
                "abandonment",
                "thresholds must be distinct and ordered from highest to lowest",
            ));
        }
        Ok(())
    }

    /// Index of the tier matching a simulated wait, if any
    pub fn bucket(&self, simulated_wait_secs: f64) -> Option<usize> {
        self.tiers
            .iter()
            .position(|tier| simulated_wait_secs > tier.threshold_secs)
    }

    /// Abandonment probability for a simulated wait
    pub fn probability(&self, simulated_wait_secs: f64) -> f64 {
        self.bucket(simulated_wait_secs)
            .map_or(0.0, |i| self.tiers[i].probability)
    }

    /// Draw whether a patient who waited `waited_real` abandons.
    ///
    /// The real wait is converted to simulated time with `speed_factor`.
    pub fn should_abandon(
        &self,
        waited_real: Duration,
        speed_factor: f64,
        rng: &mut fastrand::Rng,
    ) -> bool {
        let probability = self.probability(waited_real.as_secs_f64() * speed_factor);
        probability > 0.0 && rng.f64() < probability
    }
}
