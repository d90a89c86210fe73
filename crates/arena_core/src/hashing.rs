//! Toolchain-stable state hashing.
//!
//! Replay files store state hashes, so the hasher behind
//! [`Simulation::state_hash`](crate::simulation::Simulation::state_hash)
//! must give the same answer on every platform and every Rust release.
//! `std`'s `DefaultHasher` promises neither; [`StableHasher`] is plain
//! 64-bit FNV-1a with pointer-sized integers widened to 64 bits.

use std::hash::Hasher;

const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// 64-bit FNV-1a.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableHasher {
    state: u64,
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StableHasher {
    /// A hasher at the FNV offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= u64::from(*byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    // Same bytes on 32- and 64-bit targets.
    fn write_usize(&mut self, n: usize) {
        self.write_u64(n as u64);
    }

    fn write_isize(&mut self, n: isize) {
        self.write_i64(n as i64);
    }
}
