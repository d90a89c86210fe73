//! Seeded pseudo-random source.
//!
//! Every random decision in the simulation (map layout, AI, drops, UFO
//! wobble, spawner rolls) goes through [`SeededRandom`]. Two sources built
//! from the same seed produce the same sequence on every platform.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Offset applied between the map stream and the gameplay stream of a level.
const GAMEPLAY_STREAM_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Per-level multiplier used to derive a level's map seed from the session seed.
pub const LEVEL_SEED_STRIDE: u64 = 12_345;

/// Derive the map seed for `level` from a session root seed.
#[must_use]
pub const fn level_seed(session_seed: u64, level: u32) -> u64 {
    session_seed.wrapping_add((level as u64).wrapping_mul(LEVEL_SEED_STRIDE))
}

/// Derive the gameplay stream seed from a level's map seed.
#[must_use]
pub const fn gameplay_seed(map_seed: u64) -> u64 {
    map_seed ^ GAMEPLAY_STREAM_SALT
}

/// Deterministic random number source.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: Pcg64,
}

impl SeededRandom {
    /// Create a source from a 64-bit seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    /// The seed this source was built from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `0..range`. Returns 0 when `range` is 0.
    pub fn next_int(&mut self, range: u32) -> u32 {
        if range == 0 {
            return 0;
        }
        self.rng.gen_range(0..range)
    }

    /// Uniform integer in `lo..=hi`. Returns `lo` when the range is empty.
    pub fn range_inclusive(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform double in `[0, 1)`.
    pub fn next_double(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Fair coin.
    pub fn next_bool(&mut self) -> bool {
        self.rng.gen::<bool>()
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_double() < p.clamp(0.0, 1.0)
    }

    /// Pick one element uniformly, `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Pick an index from a weight table. Weights need not sum to 1.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || weights.is_empty() {
            return 0;
        }
        let mut roll = self.next_double() * total;
        for (idx, weight) in weights.iter().enumerate() {
            if roll < *weight {
                return idx;
            }
            roll -= weight;
        }
        weights.len() - 1
    }
}
