//! Seeded randomness.

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Random number generator whose whole output is fixed by its seed.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    inner: StdRng,
}

impl DeterministicRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent stream for a sub-component, derived from this seed.
    #[must_use]
    pub fn fork(&self, stream: u64) -> Self {
        Self::new(self.seed.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.inner.gen_range(range)
    }

    /// `true` with probability `p`.
    pub fn gen_bool(&mut self, p: f64) -> bool {
        debug_assert!((0.0..=1.0).contains(&p), "probability out of range: {}", p);
        self.inner.gen_bool(p)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Underlying generator, for APIs that take `impl Rng`.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.inner
    }
}
