//! Fault probability configuration and injection.

use serde::{Deserialize, Serialize};

use crate::random::DeterministicRng;

/// How often faults fire at operation boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Probability of a fault at each boundary, in `[0, 1]`.
    pub probability: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self { probability: 0.05 }
    }
}

impl FaultConfig {
    /// No faults.
    #[must_use]
    pub fn none() -> Self {
        Self { probability: 0.0 }
    }

    /// Frequent faults.
    #[must_use]
    pub fn aggressive() -> Self {
        Self { probability: 0.3 }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&probability),
            "fault probability must be in [0, 1], got {}",
            probability
        );
        self.probability = probability.clamp(0.0, 1.0);
        self
    }
}

/// Decides, deterministically, whether a fault fires.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    injected: u64,
}

impl FaultInjector {
    #[must_use]
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        Self {
            rng,
            config,
            injected: 0,
        }
    }

    pub fn should_fail(&mut self) -> bool {
        if self.config.probability <= 0.0 {
            return false;
        }
        let fire = self.rng.gen_bool(self.config.probability);
        if fire {
            self.injected += 1;
        }
        fire
    }

    #[must_use]
    pub fn injected_count(&self) -> u64 {
        self.injected
    }

    #[must_use]
    pub fn config(&self) -> FaultConfig {
        self.config
    }
}
