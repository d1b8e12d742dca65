//! Per-episode RNG seeding with ChaCha8.
//!
//! Each episode gets its own ChaCha8Rng seeded from
//! `(run_seed + episode_index)`. Same seed -> same actions, always.
//! Nothing in the engine draws from a process-wide generator.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seed recorded for episode `episode_index` of a run seeded with `run_seed`.
pub fn episode_seed(run_seed: u64, episode_index: u64) -> u64 {
    run_seed.wrapping_add(episode_index)
}

/// Create the deterministic RNG for one episode of a run.
pub fn episode_rng(run_seed: u64, episode_index: u64) -> ChaCha8Rng {
    seeded_rng(episode_seed(run_seed, episode_index))
}

/// Create an RNG directly from an episode seed (as stored in artifacts).
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
