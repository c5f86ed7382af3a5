//! Randomness contracts consumed by simulation models.
//!
//! The kernel itself never draws random numbers; models and
//! distribution collaborators do, through the narrow [`RandomSource`]
//! and [`Distribution`] traits. The provided [`ChaChaSource`] gives
//! seedable, reproducible streams — two sources with the same seed
//! produce identical draws, which together with the deterministic
//! engine makes whole runs replayable.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A seedable stream of uniform(0, 1) draws.
pub trait RandomSource {
    /// One uniform draw in [0, 1).
    fn next_uniform(&mut self) -> f64;

    /// Reset the stream to a deterministic state derived from `seed`.
    fn reseed(&mut self, seed: u64);
}

/// Default random source backed by ChaCha8.
#[derive(Debug, Clone)]
pub struct ChaChaSource {
    rng: ChaCha8Rng,
}

impl ChaChaSource {
    /// Create a source seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        ChaChaSource { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl RandomSource for ChaChaSource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

/// A probability distribution that can be sampled through a
/// [`RandomSource`]. The kernel is agnostic to which distribution a
/// model uses.
pub trait Distribution {
    /// Produce one sample.
    fn sample(&self, source: &mut dyn RandomSource) -> f64;
}

/// Exponential distribution with the given rate, via inversion.
#[derive(Debug, Clone, Copy)]
pub struct Exponential {
    rate: f64,
}

impl Exponential {
    /// # Panics
    /// Panics unless `rate` is finite and positive.
    pub fn new(rate: f64) -> Self {
        assert!(
            rate.is_finite() && rate > 0.0,
            "rate must be finite and positive, got {}",
            rate
        );
        Exponential { rate }
    }

    /// The rate parameter.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Distribution for Exponential {
    fn sample(&self, source: &mut dyn RandomSource) -> f64 {
        // Inversion; 1 - u keeps the argument strictly positive.
        -(1.0 - source.next_uniform()).ln() / self.rate
    }
}

/// Derive the seed for replication `index` from a base seed.
///
/// One SplitMix64 scramble per index, so consecutive replications get
/// decorrelated, reproducible streams.
pub fn spawn_seed(base: u64, index: u64) -> u64 {
    let mut z = base
        .wrapping_add(index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
