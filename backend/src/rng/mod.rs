//! Deterministic random number generation
//!
//! All randomness in the scenario environment goes through [`TrafficRng`],
//! so `(config, seed)` fully determines an episode.

mod xorshift;

pub use xorshift::TrafficRng;

/// Seed for episode `episode` of a run seeded with `base`
///
/// Consecutive episodes use consecutive seeds.
pub fn episode_seed(base: u64, episode: usize) -> u64 {
    base.wrapping_add(episode as u64)
}
