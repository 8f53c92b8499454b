// src/core/rng.rs

//! Seeded randomness shared by the engines.
//!
//! Every random draw in a run (measurement sampling, k-means++ seeding,
//! train/test shuffling) goes through a `StdRng` built here, so a fixed seed
//! reproduces a run exactly.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Builds the run RNG. Without a seed, one is drawn from the thread RNG.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(|| rand::rng().random::<u64>());
    StdRng::seed_from_u64(seed)
}
