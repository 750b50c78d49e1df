//! Deterministic RNG wrapper and seed-derivation helpers.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Substream used for input graph topology.
pub const SUBSTREAM_TOPOLOGY: u64 = 1;
/// Substream used for the per-node random numbers of the input graph.
pub const SUBSTREAM_RAND_NRS: u64 = 2;
/// Substream used when selecting radiation-damaged neurons.
pub const SUBSTREAM_RADIATION: u64 = 3;

/// Deterministic RNG handle used by every randomised collaborator.
///
/// A master `seed: u64` comes from the run configuration. Substreams are
/// derived by hashing `(master_seed, substream_id)` with SipHash-1-3 under
/// fixed zero keys, so the same run configuration always draws the same
/// input graph, random numbers and radiation damage on every platform.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a handle for a derived substream of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

/// Derives the master seed of one input graph from the experiment seed and
/// the graph's structural coordinates.
pub fn graph_seed(seed: u64, graph_size: u32, graph_nr: u32) -> u64 {
    let coordinates = (u64::from(graph_size) << 32) | u64::from(graph_nr);
    derive_substream_seed(seed, coordinates)
}
