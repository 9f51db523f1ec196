//! # rb-dst
//!
//! Deterministic Simulation Testing for SPSC ring buffers.
//!
//! All randomness (operation mix, fault timing, fault kind) derives from one
//! seed, so any failing run can be replayed exactly.
//!
//! ## Usage
//!
//! ```rust
//! use rb_dst::{random_operations, run_dst_scenario, DeterministicRng, DstConfig};
//! use rb_ring::HeapRingBuffer;
//!
//! let config = DstConfig::default();
//! let ops = random_operations(&mut DeterministicRng::new(config.seed), 500);
//! let result = run_dst_scenario::<HeapRingBuffer<u64>>(&config, ops).unwrap();
//! assert!(result.passed, "{}", result.format());
//! ```
//!
//! ## Reproducibility
//!
//! ```bash
//! DST_SEED=12345 DST_ITERATIONS=10000 cargo test -p rb-dst
//! rb-dst --seed 12345 --policy block --capacity 4
//! ```

pub mod fault;
pub mod fault_injection;
pub mod random;

pub use fault::{FaultConfig, FaultInjector};
pub use fault_injection::{
    random_operations, run_dst_scenario, DstError, DstResult, DstRunner, DstStats, FaultPoint,
    FaultType,
};
pub use random::DeterministicRng;

use rb_ring::OverflowPolicy;
use serde::Serialize;
use tracing::warn;

pub const DST_SEED_VAR: &str = "DST_SEED";
pub const DST_ITERATIONS_VAR: &str = "DST_ITERATIONS";

const ITERATIONS_DEFAULT: usize = 1_000;

/// Configuration for a DST run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DstConfig {
    pub seed: u64,
    pub policy: OverflowPolicy,
    pub capacity: usize,
    /// Operations per run.
    pub iterations: usize,
    pub faults: FaultConfig,
}

impl Default for DstConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            policy: OverflowPolicy::Overwrite,
            capacity: 4,
            iterations: ITERATIONS_DEFAULT,
            faults: FaultConfig::default(),
        }
    }
}

impl DstConfig {
    /// Defaults overridden by `DST_SEED` and `DST_ITERATIONS`.
    ///
    /// Without `DST_SEED` a random seed is generated and printed.
    pub fn from_env() -> Result<Self, DstError> {
        Self::resolve(None, None)
    }

    /// Like [`from_env`](Self::from_env), but an explicit seed or iteration
    /// count replaces its variable, which is then not read at all.
    pub fn resolve(seed: Option<u64>, iterations: Option<usize>) -> Result<Self, DstError> {
        Self::resolve_with(seed, iterations, |var| std::env::var(var).ok())
    }

    fn resolve_with(
        seed: Option<u64>,
        iterations: Option<usize>,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, DstError> {
        let seed = match seed {
            Some(seed) => seed,
            None => match parse_env(DST_SEED_VAR, lookup(DST_SEED_VAR))? {
                Some(seed) => {
                    println!("{}={} (from environment)", DST_SEED_VAR, seed);
                    seed
                }
                None => generate_seed(),
            },
        };
        let iterations = match iterations {
            Some(iterations) => iterations,
            None => match parse_env(DST_ITERATIONS_VAR, lookup(DST_ITERATIONS_VAR))? {
                Some(n) => usize::try_from(n).map_err(|_| DstError::InvalidEnv {
                    var: DST_ITERATIONS_VAR,
                    value: n.to_string(),
                })?,
                None => ITERATIONS_DEFAULT,
            },
        };

        Ok(Self {
            seed,
            iterations,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_faults(mut self, faults: FaultConfig) -> Self {
        self.faults = faults;
        self
    }
}

/// Parse an unsigned environment value; unset is `None`, garbage is `InvalidEnv`.
fn parse_env(var: &'static str, value: Option<String>) -> Result<Option<u64>, DstError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DstError::InvalidEnv { var, value }),
        None => Ok(None),
    }
}

fn generate_seed() -> u64 {
    // Zero is reserved: counterexamples treat it as "no seed".
    let seed = rand::random::<u64>().max(1);
    println!("{}={} (randomly generated)", DST_SEED_VAR, seed);
    seed
}

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
/// An unparseable `DST_SEED` is reported and replaced by a fresh seed.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match parse_env(DST_SEED_VAR, std::env::var(DST_SEED_VAR).ok()) {
        Ok(Some(seed)) => {
            println!("{}={} (from environment)", DST_SEED_VAR, seed);
            seed
        }
        Ok(None) => generate_seed(),
        Err(err) => {
            warn!(%err, "ignoring {}", DST_SEED_VAR);
            generate_seed()
        }
    }
}
